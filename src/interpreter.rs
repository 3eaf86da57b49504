use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expr, ExprId, ExprKind, LiteralValue, Stmt};
use crate::diagnostics::{DiagnosticSink, RuntimeError};
use crate::environment::{EnvId, Environments};
use crate::io::Writer;
use crate::token::{Token, TokenKind};
use crate::value::{Callable, Value};

/// How statement/expression execution can end early. `Return` is not an error — it's the
/// non-local-exit signal a `return` statement produces — but sharing `Result`'s `?`
/// propagation with genuine runtime errors is the idiomatic way to unwind call frames
/// without panics or a second control-flow mechanism, matching the "Outcome sum" design
/// note (`spec.md §9`).
enum ExecError {
	Runtime(RuntimeError),
	Return(Value),
}

impl From<RuntimeError> for ExecError {
	fn from(error: RuntimeError) -> Self {
		ExecError::Runtime(error)
	}
}

type ExecResult<T> = Result<T, ExecError>;

/// Owns the whole runtime picture for one program run: the environment arena, the
/// globals id, the resolver's `ExprId -> depth` side table, where `print` goes, and
/// where diagnostics go. A fresh `Interpreter` gets its own globals, so two
/// interpreters never share mutable global state (`spec.md §9`).
pub struct Interpreter<'a> {
	envs: Environments,
	globals: EnvId,
	locals: HashMap<ExprId, usize>,
	writer: &'a mut dyn Writer,
	sink: &'a mut dyn DiagnosticSink,
}

impl<'a> Interpreter<'a> {
	#[must_use]
	pub fn new(writer: &'a mut dyn Writer, sink: &'a mut dyn DiagnosticSink) -> Self {
		let (mut envs, globals) = Environments::new();
		crate::native::install(&mut envs, globals);
		Self { envs, globals, locals: HashMap::new(), writer, sink }
	}

	/// Records the scope depth the resolver computed for a `Variable`/`Assign` node.
	/// Absence means "not found by the resolver, so look it up in globals directly" —
	/// the same convention the book's interpreter uses for top-level references.
	pub fn resolve(&mut self, id: ExprId, depth: usize) {
		self.locals.insert(id, depth);
	}

	/// Gives the resolver a way to report compile-time diagnostics (duplicate
	/// declarations, top-level `return`) through the same sink the interpreter itself
	/// was built with, since the interpreter already holds the sink's only mutable
	/// borrow for its lifetime.
	pub fn diagnostics(&mut self) -> &mut dyn DiagnosticSink {
		self.sink
	}

	/// Executes every statement in `program` against the global environment, reporting
	/// at most one runtime error to the sink (evaluation stops at the first one,
	/// matching `spec.md §4.4`: the host process stops rather than trying to continue
	/// after undefined behavior).
	pub fn interpret(&mut self, program: &[Stmt]) {
		let global = self.globals;
		for stmt in program {
			if let Err(error) = self.execute(stmt, global) {
				match error {
					ExecError::Runtime(error) => {
						self.sink.runtime_error(&error);
						return;
					}
					ExecError::Return(_) => unreachable!("top-level return is rejected by the resolver before interpretation"),
				}
			}
		}
	}

	fn execute(&mut self, stmt: &Stmt, env: EnvId) -> ExecResult<()> {
		match stmt {
			Stmt::Expression(expr) => {
				self.evaluate(expr, env)?;
				Ok(())
			}
			Stmt::Print(expr) => {
				let value = self.evaluate(expr, env)?;
				self.writer.write_line(&value.to_string());
				Ok(())
			}
			Stmt::Var(name, initializer) => {
				let value = match initializer {
					Some(expr) => self.evaluate(expr, env)?,
					None => Value::Nil,
				};
				self.envs.define(env, &name.lexeme, value);
				Ok(())
			}
			Stmt::Block(statements) => {
				let child = self.envs.child(env);
				self.execute_block(statements, child)
			}
			Stmt::If(condition, then_branch, else_branch) => {
				if self.evaluate(condition, env)?.is_truthy() {
					self.execute(then_branch, env)
				} else if let Some(else_branch) = else_branch {
					self.execute(else_branch, env)
				} else {
					Ok(())
				}
			}
			Stmt::While(condition, body) => {
				while self.evaluate(condition, env)?.is_truthy() {
					self.execute(body, env)?;
				}
				Ok(())
			}
			Stmt::Function(declaration) => {
				let callable = Callable::User { declaration: Rc::clone(declaration), closure: env };
				self.envs.define(env, &declaration.name.lexeme, Value::Callable(Rc::new(callable)));
				Ok(())
			}
			Stmt::Return(_, value) => {
				let value = match value {
					Some(expr) => self.evaluate(expr, env)?,
					None => Value::Nil,
				};
				Err(ExecError::Return(value))
			}
		}
	}

	fn execute_block(&mut self, statements: &[Stmt], env: EnvId) -> ExecResult<()> {
		for stmt in statements {
			self.execute(stmt, env)?;
		}
		Ok(())
	}

	fn evaluate(&mut self, expr: &Expr, env: EnvId) -> ExecResult<Value> {
		match &expr.kind {
			ExprKind::Literal(value) => Ok(literal_value(value)),
			ExprKind::Grouping(inner) => self.evaluate(inner, env),
			ExprKind::Unary(operator, operand) => self.evaluate_unary(operator, operand, env),
			ExprKind::Binary(left, operator, right) => self.evaluate_binary(left, operator, right, env),
			ExprKind::Logical(left, operator, right) => self.evaluate_logical(left, operator, right, env),
			ExprKind::Variable(name) => self.look_up_variable(name, expr.id, env),
			ExprKind::Assign(name, value) => {
				let value = self.evaluate(value, env)?;
				match self.locals.get(&expr.id) {
					Some(&depth) => self.envs.assign_at(env, depth, &name.lexeme, value.clone()),
					None => self.envs.assign(self.globals, name, value.clone())?,
				}
				Ok(value)
			}
			ExprKind::Call(callee, paren, arguments) => self.evaluate_call(callee, paren, arguments, env),
		}
	}

	fn look_up_variable(&self, name: &Token, id: ExprId, env: EnvId) -> ExecResult<Value> {
		match self.locals.get(&id) {
			Some(&depth) => Ok(self.envs.get_at(env, depth, &name.lexeme)),
			None => Ok(self.envs.get(self.globals, name)?),
		}
	}

	fn evaluate_unary(&mut self, operator: &Token, operand: &Expr, env: EnvId) -> ExecResult<Value> {
		let value = self.evaluate(operand, env)?;
		match operator.kind {
			TokenKind::Minus => {
				let n = number_operand(operator, &value)?;
				Ok(Value::Number(-n))
			}
			TokenKind::Bang => Ok(Value::Boolean(!value.is_truthy())),
			_ => unreachable!("parser only produces Unary nodes for '-' and '!'"),
		}
	}

	fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr, env: EnvId) -> ExecResult<Value> {
		let left_value = self.evaluate(left, env)?;
		match operator.kind {
			TokenKind::Or if left_value.is_truthy() => Ok(left_value),
			TokenKind::Or => self.evaluate(right, env),
			TokenKind::And if !left_value.is_truthy() => Ok(left_value),
			TokenKind::And => self.evaluate(right, env),
			_ => unreachable!("parser only produces Logical nodes for 'and'/'or'"),
		}
	}

	fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr, env: EnvId) -> ExecResult<Value> {
		let left = self.evaluate(left, env)?;
		let right = self.evaluate(right, env)?;

		match operator.kind {
			TokenKind::Minus => Ok(Value::Number(number_operand(operator, &left)? - number_operand(operator, &right)?)),
			TokenKind::Slash => {
				let divisor = number_operand(operator, &right)?;
				if divisor == 0.0 {
					return Err(RuntimeError::new(operator.clone(), "Division by zero.").into());
				}
				Ok(Value::Number(number_operand(operator, &left)? / divisor))
			}
			TokenKind::Star => Ok(Value::Number(number_operand(operator, &left)? * number_operand(operator, &right)?)),
			TokenKind::Plus => match (&left, &right) {
				(Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
				(Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
				_ => Err(RuntimeError::new(operator.clone(), "Operands must be two numbers or two strings.").into()),
			},
			TokenKind::Greater => Ok(Value::Boolean(number_operand(operator, &left)? > number_operand(operator, &right)?)),
			TokenKind::GreaterEqual => Ok(Value::Boolean(number_operand(operator, &left)? >= number_operand(operator, &right)?)),
			TokenKind::Less => Ok(Value::Boolean(number_operand(operator, &left)? < number_operand(operator, &right)?)),
			TokenKind::LessEqual => Ok(Value::Boolean(number_operand(operator, &left)? <= number_operand(operator, &right)?)),
			TokenKind::EqualEqual => Ok(Value::Boolean(left.is_equal(&right))),
			TokenKind::BangEqual => Ok(Value::Boolean(!left.is_equal(&right))),
			_ => unreachable!("parser only produces Binary nodes for arithmetic/comparison/equality operators"),
		}
	}

	fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr], env: EnvId) -> ExecResult<Value> {
		let callee_value = self.evaluate(callee, env)?;
		let mut argument_values = Vec::with_capacity(arguments.len());
		for argument in arguments {
			argument_values.push(self.evaluate(argument, env)?);
		}

		let Value::Callable(callable) = callee_value else {
			return Err(RuntimeError::new(paren.clone(), "Can only call functions and classes.").into());
		};

		if argument_values.len() != callable.arity() {
			return Err(RuntimeError::new(
				paren.clone(),
				format!("Expected {} arguments but got {}.", callable.arity(), argument_values.len()),
			)
			.into());
		}

		self.call(&callable, &argument_values)
	}

	fn call(&mut self, callable: &Callable, arguments: &[Value]) -> ExecResult<Value> {
		match callable {
			Callable::Native { func, .. } => Ok(func(arguments)?),
			Callable::User { declaration, closure } => {
				let call_env = self.envs.child(*closure);
				for (param, argument) in declaration.params.iter().zip(arguments) {
					self.envs.define(call_env, &param.lexeme, argument.clone());
				}
				match self.execute_block(&declaration.body, call_env) {
					Ok(()) => Ok(Value::Nil),
					Err(ExecError::Return(value)) => Ok(value),
					Err(other) => Err(other),
				}
			}
		}
	}
}

fn literal_value(value: &LiteralValue) -> Value {
	match value {
		LiteralValue::Nil => Value::Nil,
		LiteralValue::Bool(b) => Value::Boolean(*b),
		LiteralValue::Number(n) => Value::Number(*n),
		LiteralValue::Str(s) => Value::String(s.clone()),
	}
}

fn number_operand(operator: &Token, value: &Value) -> Result<f64, RuntimeError> {
	match value {
		Value::Number(n) => Ok(*n),
		_ => Err(RuntimeError::new(operator.clone(), "Operand must be a number.")),
	}
}
