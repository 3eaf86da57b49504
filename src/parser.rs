use std::rc::Rc;

use crate::ast::{Expr, ExprId, ExprKind, FunctionDecl, LiteralValue, Stmt};
use crate::diagnostics::DiagnosticSink;
use crate::token::{Literal, Token, TokenKind};

const MAX_ARGS: usize = 255;

/// Signals that a parse error has already been reported to the sink and the current
/// production should unwind to the nearest `declaration()` call for panic-mode
/// synchronization (`spec.md §4.2`). Carries no data of its own — the message already
/// reached the sink at the point of failure.
struct ParseError;

type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser over a token sequence. Produces a statement list; on error,
/// reports to the sink, synchronizes to the next likely statement boundary, and omits a
/// subtree for the failed declaration rather than aborting the whole parse.
pub struct Parser<'a> {
	tokens: Vec<Token>,
	current: usize,
	sink: &'a mut dyn DiagnosticSink,
	next_expr_id: ExprId,
}

impl<'a> Parser<'a> {
	#[must_use]
	pub fn new(tokens: Vec<Token>, sink: &'a mut dyn DiagnosticSink) -> Self {
		Self { tokens, current: 0, sink, next_expr_id: 0 }
	}

	pub fn parse(mut self) -> Vec<Stmt> {
		let mut statements = Vec::new();
		while !self.is_at_end() {
			if let Some(stmt) = self.declaration() {
				statements.push(stmt);
			}
		}
		statements
	}

	// --- token stream primitives -----------------------------------------------------

	fn is_at_end(&self) -> bool {
		self.peek().kind == TokenKind::Eof
	}

	fn peek(&self) -> &Token {
		&self.tokens[self.current]
	}

	fn previous(&self) -> &Token {
		&self.tokens[self.current - 1]
	}

	fn advance(&mut self) -> &Token {
		if !self.is_at_end() {
			self.current += 1;
		}
		self.previous()
	}

	fn check(&self, kind: TokenKind) -> bool {
		!self.is_at_end() && self.peek().kind == kind
	}

	fn matches(&mut self, kinds: &[TokenKind]) -> bool {
		for kind in kinds {
			if self.check(*kind) {
				self.advance();
				return true;
			}
		}
		false
	}

	fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<&Token> {
		if self.check(kind) {
			return Ok(self.advance());
		}
		let token = self.peek().clone();
		Err(self.error(&token, message))
	}

	fn error(&mut self, token: &Token, message: &str) -> ParseError {
		self.sink.error_at_token(token, message);
		ParseError
	}

	fn next_id(&mut self) -> ExprId {
		let id = self.next_expr_id;
		self.next_expr_id += 1;
		id
	}

	fn expr(&mut self, kind: ExprKind) -> Expr {
		let id = self.next_id();
		Expr { id, kind }
	}

	/// Discards tokens until the previous one was a statement terminator or the next one
	/// starts a new declaration/statement. Called after a parse error unwinds out of
	/// `declaration()`.
	fn synchronize(&mut self) {
		self.advance();
		while !self.is_at_end() {
			if self.previous().kind == TokenKind::Semicolon {
				return;
			}
			match self.peek().kind {
				TokenKind::Class
				| TokenKind::Fun
				| TokenKind::Var
				| TokenKind::For
				| TokenKind::If
				| TokenKind::While
				| TokenKind::Print
				| TokenKind::Return => return,
				_ => {
					self.advance();
				}
			}
		}
	}

	// --- declarations ------------------------------------------------------------

	fn declaration(&mut self) -> Option<Stmt> {
		let result = if self.matches(&[TokenKind::Var]) {
			self.var_declaration()
		} else if self.matches(&[TokenKind::Fun]) {
			self.function_declaration("function")
		} else {
			self.statement()
		};

		match result {
			Ok(stmt) => Some(stmt),
			Err(ParseError) => {
				self.synchronize();
				None
			}
		}
	}

	fn var_declaration(&mut self) -> ParseResult<Stmt> {
		let name = self.consume(TokenKind::Identifier, "Expect variable name.")?.clone();
		let initializer = if self.matches(&[TokenKind::Equal]) { Some(self.expression()?) } else { None };
		self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
		Ok(Stmt::Var(name, initializer))
	}

	fn function_declaration(&mut self, kind: &str) -> ParseResult<Stmt> {
		let name = self.consume(TokenKind::Identifier, &format!("Expect {kind} name."))?.clone();
		self.consume(TokenKind::LeftParen, &format!("Expect '(' after {kind} name."))?;

		let mut params = Vec::new();
		if !self.check(TokenKind::RightParen) {
			loop {
				if params.len() >= MAX_ARGS {
					let token = self.peek().clone();
					self.error(&token, "Can't have more than 255 parameters.");
				}
				params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?.clone());
				if !self.matches(&[TokenKind::Comma]) {
					break;
				}
			}
		}
		self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;

		self.consume(TokenKind::LeftBrace, &format!("Expect '{{' before {kind} body."))?;
		let body = self.block()?;

		Ok(Stmt::Function(Rc::new(FunctionDecl { name, params, body })))
	}

	// --- statements ----------------------------------------------------------------

	fn statement(&mut self) -> ParseResult<Stmt> {
		if self.matches(&[TokenKind::Print]) {
			return self.print_statement();
		}
		if self.matches(&[TokenKind::LeftBrace]) {
			return Ok(Stmt::Block(self.block()?));
		}
		if self.matches(&[TokenKind::If]) {
			return self.if_statement();
		}
		if self.matches(&[TokenKind::While]) {
			return self.while_statement();
		}
		if self.matches(&[TokenKind::For]) {
			return self.for_statement();
		}
		if self.matches(&[TokenKind::Return]) {
			return self.return_statement();
		}
		self.expression_statement()
	}

	fn print_statement(&mut self) -> ParseResult<Stmt> {
		let value = self.expression()?;
		self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
		Ok(Stmt::Print(value))
	}

	fn expression_statement(&mut self) -> ParseResult<Stmt> {
		let value = self.expression()?;
		self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
		Ok(Stmt::Expression(value))
	}

	fn block(&mut self) -> ParseResult<Vec<Stmt>> {
		let mut statements = Vec::new();
		while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
			if let Some(stmt) = self.declaration() {
				statements.push(stmt);
			}
		}
		self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
		Ok(statements)
	}

	fn if_statement(&mut self) -> ParseResult<Stmt> {
		self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
		let condition = self.expression()?;
		self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

		let then_branch = Box::new(self.statement()?);
		let else_branch = if self.matches(&[TokenKind::Else]) { Some(Box::new(self.statement()?)) } else { None };

		Ok(Stmt::If(condition, then_branch, else_branch))
	}

	fn while_statement(&mut self) -> ParseResult<Stmt> {
		self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
		let condition = self.expression()?;
		self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
		let body = Box::new(self.statement()?);
		Ok(Stmt::While(condition, body))
	}

	/// Desugars `for (init; cond; update) body` into `{ init; while (cond) { body; update; } }`
	/// (`spec.md §4.2`). `cond` defaults to a literal `true` when omitted; the inner
	/// block wrapping `body`/`update` is elided when there's no update, and the outer
	/// wrapping block is elided when there's no initializer.
	fn for_statement(&mut self) -> ParseResult<Stmt> {
		self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

		let initializer = if self.matches(&[TokenKind::Semicolon]) {
			None
		} else if self.matches(&[TokenKind::Var]) {
			Some(self.var_declaration()?)
		} else {
			Some(self.expression_statement()?)
		};

		let condition = if self.check(TokenKind::Semicolon) { None } else { Some(self.expression()?) };
		self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

		let increment = if self.check(TokenKind::RightParen) { None } else { Some(self.expression()?) };
		self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

		let mut body = self.statement()?;

		if let Some(increment) = increment {
			body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
		}

		let condition = condition.unwrap_or_else(|| self.true_literal());
		body = Stmt::While(condition, Box::new(body));

		if let Some(initializer) = initializer {
			body = Stmt::Block(vec![initializer, body]);
		}

		Ok(body)
	}

	fn true_literal(&mut self) -> Expr {
		self.expr(ExprKind::Literal(LiteralValue::Bool(true)))
	}

	fn return_statement(&mut self) -> ParseResult<Stmt> {
		let keyword = self.previous().clone();
		let value = if self.check(TokenKind::Semicolon) { None } else { Some(self.expression()?) };
		self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
		Ok(Stmt::Return(keyword, value))
	}

	// --- expressions -----------------------------------------------------------------

	fn expression(&mut self) -> ParseResult<Expr> {
		self.assignment()
	}

	fn assignment(&mut self) -> ParseResult<Expr> {
		let expr = self.or()?;

		if self.matches(&[TokenKind::Equal]) {
			let equals = self.previous().clone();
			let value = self.assignment()?;

			if let ExprKind::Variable(name) = expr.kind {
				return Ok(self.expr(ExprKind::Assign(name, Box::new(value))));
			}

			self.error(&equals, "Invalid assignment target.");
			return Ok(expr);
		}

		Ok(expr)
	}

	fn or(&mut self) -> ParseResult<Expr> {
		let mut expr = self.and()?;
		while self.matches(&[TokenKind::Or]) {
			let operator = self.previous().clone();
			let right = self.and()?;
			expr = self.expr(ExprKind::Logical(Box::new(expr), operator, Box::new(right)));
		}
		Ok(expr)
	}

	fn and(&mut self) -> ParseResult<Expr> {
		let mut expr = self.equality()?;
		while self.matches(&[TokenKind::And]) {
			let operator = self.previous().clone();
			let right = self.equality()?;
			expr = self.expr(ExprKind::Logical(Box::new(expr), operator, Box::new(right)));
		}
		Ok(expr)
	}

	fn equality(&mut self) -> ParseResult<Expr> {
		self.binary_left_assoc(Self::comparison, &[TokenKind::BangEqual, TokenKind::EqualEqual])
	}

	fn comparison(&mut self) -> ParseResult<Expr> {
		self.binary_left_assoc(Self::addition, &[TokenKind::Greater, TokenKind::GreaterEqual, TokenKind::Less, TokenKind::LessEqual])
	}

	fn addition(&mut self) -> ParseResult<Expr> {
		self.binary_left_assoc(Self::multiplication, &[TokenKind::Plus, TokenKind::Minus])
	}

	fn multiplication(&mut self) -> ParseResult<Expr> {
		self.binary_left_assoc(Self::unary, &[TokenKind::Star, TokenKind::Slash])
	}

	/// Shared left-associative binary-operator climbing step: parse one operand with
	/// `operand`, then fold in `operator operand` pairs while the next token is one of
	/// `kinds`.
	fn binary_left_assoc(&mut self, operand: fn(&mut Self) -> ParseResult<Expr>, kinds: &[TokenKind]) -> ParseResult<Expr> {
		let mut expr = operand(self)?;
		while self.matches(kinds) {
			let operator = self.previous().clone();
			let right = operand(self)?;
			expr = self.expr(ExprKind::Binary(Box::new(expr), operator, Box::new(right)));
		}
		Ok(expr)
	}

	fn unary(&mut self) -> ParseResult<Expr> {
		if self.matches(&[TokenKind::Bang, TokenKind::Minus]) {
			let operator = self.previous().clone();
			let right = self.unary()?;
			return Ok(self.expr(ExprKind::Unary(operator, Box::new(right))));
		}
		self.call()
	}

	fn call(&mut self) -> ParseResult<Expr> {
		let mut expr = self.primary()?;
		loop {
			if self.matches(&[TokenKind::LeftParen]) {
				expr = self.finish_call(expr)?;
			} else {
				break;
			}
		}
		Ok(expr)
	}

	fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
		let mut arguments = Vec::new();
		if !self.check(TokenKind::RightParen) {
			loop {
				if arguments.len() >= MAX_ARGS {
					let token = self.peek().clone();
					self.error(&token, "Can't have more than 255 arguments.");
				}
				arguments.push(self.expression()?);
				if !self.matches(&[TokenKind::Comma]) {
					break;
				}
			}
		}
		let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?.clone();
		Ok(self.expr(ExprKind::Call(Box::new(callee), paren, arguments)))
	}

	fn primary(&mut self) -> ParseResult<Expr> {
		if self.matches(&[TokenKind::False]) {
			return Ok(self.expr(ExprKind::Literal(LiteralValue::Bool(false))));
		}
		if self.matches(&[TokenKind::True]) {
			return Ok(self.expr(ExprKind::Literal(LiteralValue::Bool(true))));
		}
		if self.matches(&[TokenKind::Nil]) {
			return Ok(self.expr(ExprKind::Literal(LiteralValue::Nil)));
		}
		if self.matches(&[TokenKind::Number]) {
			let Literal::Number(value) = self.previous().literal.clone() else {
				unreachable!("scanner guarantees a NUMBER token carries a Literal::Number payload");
			};
			return Ok(self.expr(ExprKind::Literal(LiteralValue::Number(value))));
		}
		if self.matches(&[TokenKind::String]) {
			let Literal::Str(value) = self.previous().literal.clone() else {
				unreachable!("scanner guarantees a STRING token carries a Literal::Str payload");
			};
			return Ok(self.expr(ExprKind::Literal(LiteralValue::Str(value))));
		}
		if self.matches(&[TokenKind::Identifier]) {
			return Ok(self.expr(ExprKind::Variable(self.previous().clone())));
		}
		if self.matches(&[TokenKind::LeftParen]) {
			let expr = self.expression()?;
			self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
			return Ok(self.expr(ExprKind::Grouping(Box::new(expr))));
		}

		let token = self.peek().clone();
		Err(self.error(&token, "Expect expression."))
	}
}
