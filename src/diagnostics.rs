use std::fmt;

use crate::token::{Token, TokenKind};

/// A runtime error: type mismatches, division by zero, undefined variables, non-callable
/// calls, arity mismatches. Carries the offending token so the sink can report a line
/// number, mirroring the teacher's `TokenError` in `context.rs`.
#[derive(Debug, Clone)]
pub struct RuntimeError {
	pub token: Token,
	pub message: String,
}

impl RuntimeError {
	#[must_use]
	pub fn new(token: Token, message: impl Into<String>) -> Self {
		Self { token, message: message.into() }
	}
}

impl fmt::Display for RuntimeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.message)
	}
}

impl std::error::Error for RuntimeError {}

/// Narrow contract consumed by the scanner, parser, resolver, and evaluator. Accumulates
/// whether any compile-time or runtime error has occurred so the CLI can compute an exit
/// code after the pipeline finishes (`spec.md §6`).
pub trait DiagnosticSink {
	/// Reports a compile-time error at a specific token (or the synthetic EOF token).
	fn error_at_token(&mut self, token: &Token, message: &str);

	/// Reports a compile-time error known only by line, with no reliable token
	/// reference (scanner-level character errors, `spec.md §9`).
	fn error_at_line(&mut self, line: usize, message: &str);

	/// Reports a runtime error, unwound to the top of `interpret`.
	fn runtime_error(&mut self, error: &RuntimeError);

	fn had_error(&self) -> bool;
	fn had_runtime_error(&self) -> bool;

	/// Resets the compile-time error flag between REPL lines. `had_runtime_error` is
	/// intentionally left untouched — see `SPEC_FULL.md §C`.
	fn reset_error(&mut self);
}

/// Default sink: prints to stderr, matching the teacher's `"Error:".bold().red()`
/// convention (`cli/commands/mod.rs`) instead of reaching for a `log`/`tracing` crate the
/// teacher never depends on.
#[derive(Debug, Default)]
pub struct ConsoleDiagnostics {
	had_error: bool,
	had_runtime_error: bool,
}

impl ConsoleDiagnostics {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn report(&mut self, line: usize, location: &str, message: &str) {
		eprintln!("[Line {line}] Error{location}: {message}");
		self.had_error = true;
	}
}

impl DiagnosticSink for ConsoleDiagnostics {
	fn error_at_token(&mut self, token: &Token, message: &str) {
		let location = if token.kind == TokenKind::Eof {
			" at end".to_owned()
		} else {
			format!(" at '{}'", token.lexeme)
		};
		self.report(token.line, &location, message);
	}

	fn error_at_line(&mut self, line: usize, message: &str) {
		self.report(line, "", message);
	}

	fn runtime_error(&mut self, error: &RuntimeError) {
		eprintln!("[Line {}] {}", error.token.line, error.message);
		self.had_runtime_error = true;
	}

	fn had_error(&self) -> bool {
		self.had_error
	}

	fn had_runtime_error(&self) -> bool {
		self.had_runtime_error
	}

	fn reset_error(&mut self) {
		self.had_error = false;
	}
}
