use std::collections::HashMap;

use crate::ast::{Expr, ExprKind, Stmt};
use crate::interpreter::Interpreter;
use crate::token::Token;

/// Tracks whether the resolver is currently walking a function body, so a stray
/// top-level `return` can be diagnosed. Passed around as a plain enum value rather than
/// compared against a type, fixing the bug where the original interpreter's resolver
/// checked `current_function != FunctionType` instead of comparing against the `NONE`
/// sentinel value (`spec.md §9`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
	None,
	Function,
}

/// Walks the AST once, ahead of evaluation, to compute how many enclosing scopes away
/// each variable reference resolves to. The result is fed into the interpreter's
/// `ExprId -> depth` side table rather than being stored back on the AST nodes
/// themselves, keeping the resolver's bookkeeping out of the tree the parser built
/// (`spec.md §4.3`).
pub struct Resolver<'a, 'b> {
	interpreter: &'a mut Interpreter<'b>,
	scopes: Vec<HashMap<String, bool>>,
	current_function: FunctionKind,
	sink_errors: Vec<(Token, String)>,
}

impl<'a, 'b> Resolver<'a, 'b> {
	#[must_use]
	pub fn new(interpreter: &'a mut Interpreter<'b>) -> Self {
		Self {
			interpreter,
			scopes: Vec::new(),
			current_function: FunctionKind::None,
			sink_errors: Vec::new(),
		}
	}

	/// Resolves a whole program and reports any errors found (duplicate local
	/// declarations, top-level `return`) through the interpreter's diagnostic sink.
	/// Call this, check `interpreter.diagnostics().had_error()`, and only then run the
	/// interpreter.
	pub fn resolve_program(&mut self, program: &[Stmt]) {
		self.resolve_statements(program);
		let errors = std::mem::take(&mut self.sink_errors);
		for (token, message) in errors {
			self.interpreter.diagnostics().error_at_token(&token, &message);
		}
	}

	fn resolve_statements(&mut self, statements: &[Stmt]) {
		for stmt in statements {
			self.resolve_statement(stmt);
		}
	}

	fn resolve_statement(&mut self, stmt: &Stmt) {
		match stmt {
			Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),
			Stmt::Var(name, initializer) => {
				self.declare(name);
				if let Some(initializer) = initializer {
					self.resolve_expr(initializer);
				}
				self.define(name);
			}
			Stmt::Block(statements) => {
				self.begin_scope();
				self.resolve_statements(statements);
				self.end_scope();
			}
			Stmt::If(condition, then_branch, else_branch) => {
				self.resolve_expr(condition);
				self.resolve_statement(then_branch);
				if let Some(else_branch) = else_branch {
					self.resolve_statement(else_branch);
				}
			}
			Stmt::While(condition, body) => {
				self.resolve_expr(condition);
				self.resolve_statement(body);
			}
			Stmt::Function(declaration) => {
				self.declare(&declaration.name);
				self.define(&declaration.name);
				self.resolve_function(&declaration.params, &declaration.body, FunctionKind::Function);
			}
			Stmt::Return(keyword, value) => {
				if self.current_function == FunctionKind::None {
					self.sink_errors.push((keyword.clone(), "Can't return from top-level code.".to_owned()));
				}
				if let Some(value) = value {
					self.resolve_expr(value);
				}
			}
		}
	}

	fn resolve_function(&mut self, params: &[Token], body: &[Stmt], kind: FunctionKind) {
		let enclosing_function = self.current_function;
		self.current_function = kind;

		self.begin_scope();
		for param in params {
			self.declare(param);
			self.define(param);
		}
		self.resolve_statements(body);
		self.end_scope();

		self.current_function = enclosing_function;
	}

	fn resolve_expr(&mut self, expr: &Expr) {
		match &expr.kind {
			ExprKind::Literal(_) => {}
			ExprKind::Grouping(inner) => self.resolve_expr(inner),
			ExprKind::Unary(_, operand) => self.resolve_expr(operand),
			ExprKind::Binary(left, _, right) | ExprKind::Logical(left, _, right) => {
				self.resolve_expr(left);
				self.resolve_expr(right);
			}
			ExprKind::Variable(name) => {
				if let Some(scope) = self.scopes.last() {
					if scope.get(&name.lexeme) == Some(&false) {
						self.sink_errors.push((name.clone(), "Can't read local variable in its own initializer.".to_owned()));
					}
				}
				self.resolve_local(expr, name);
			}
			ExprKind::Assign(name, value) => {
				self.resolve_expr(value);
				self.resolve_local(expr, name);
			}
			ExprKind::Call(callee, _, arguments) => {
				self.resolve_expr(callee);
				for argument in arguments {
					self.resolve_expr(argument);
				}
			}
		}
	}

	fn resolve_local(&mut self, expr: &Expr, name: &Token) {
		for (depth, scope) in self.scopes.iter().rev().enumerate() {
			if scope.contains_key(&name.lexeme) {
				self.interpreter.resolve(expr.id, depth);
				return;
			}
		}
		// Not found in any lexical scope: treated as a global, resolved dynamically at
		// call time instead of statically (`spec.md §9`).
	}

	fn begin_scope(&mut self) {
		self.scopes.push(HashMap::new());
	}

	fn end_scope(&mut self) {
		self.scopes.pop();
	}

	fn declare(&mut self, name: &Token) {
		let Some(scope) = self.scopes.last_mut() else { return };
		if scope.contains_key(&name.lexeme) {
			self.sink_errors.push((name.clone(), "Already a variable with this name in this scope.".to_owned()));
		}
		scope.insert(name.lexeme.clone(), false);
	}

	fn define(&mut self, name: &Token) {
		let Some(scope) = self.scopes.last_mut() else { return };
		scope.insert(name.lexeme.clone(), true);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diagnostics::ConsoleDiagnostics;
	use crate::io::CollectWriter;
	use crate::parser::Parser;
	use crate::scanner::Scanner;

	fn resolve(source: &str) -> bool {
		let mut sink = ConsoleDiagnostics::new();
		let tokens = Scanner::new(source, &mut sink).scan_tokens();
		let program = Parser::new(tokens, &mut sink).parse();
		let mut writer = CollectWriter::new();
		let mut interpreter = Interpreter::new(&mut writer, &mut sink);
		let mut resolver = Resolver::new(&mut interpreter);
		resolver.resolve_program(&program);
		interpreter.diagnostics().had_error()
	}

	#[test]
	fn top_level_return_is_an_error() {
		assert!(resolve("return 1;"));
	}

	#[test]
	fn return_inside_a_function_is_fine() {
		assert!(!resolve("fun f() { return 1; }"));
	}

	#[test]
	fn duplicate_local_declaration_is_an_error() {
		assert!(resolve("{ var a = 1; var a = 2; }"));
	}

	#[test]
	fn duplicate_global_declaration_is_allowed() {
		assert!(!resolve("var a = 1; var a = 2;"));
	}

	#[test]
	fn self_referential_initializer_is_an_error() {
		assert!(resolve("{ var a = a; }"));
	}
}
