use crate::diagnostics::DiagnosticSink;
use crate::token::{Literal, Token, TokenKind};

/// Fixed keyword table: identifiers matching one of these lexemes are tokenized as the
/// keyword instead of `Identifier`. A `phf` map, the same crate the teacher reaches for
/// to build constant lookup tables (`builtin.rs`'s `BUILTINS`), repurposed here for
/// keyword lookup instead of built-in function dispatch.
static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
	"and" => TokenKind::And,
	"class" => TokenKind::Class,
	"else" => TokenKind::Else,
	"false" => TokenKind::False,
	"for" => TokenKind::For,
	"fun" => TokenKind::Fun,
	"if" => TokenKind::If,
	"nil" => TokenKind::Nil,
	"or" => TokenKind::Or,
	"print" => TokenKind::Print,
	"return" => TokenKind::Return,
	"super" => TokenKind::Super,
	"this" => TokenKind::This,
	"true" => TokenKind::True,
	"var" => TokenKind::Var,
	"while" => TokenKind::While,
};

/// Converts a source string into a token sequence in a single left-to-right pass.
/// Unrecognized characters and unterminated strings are reported to the sink but do not
/// stop scanning — a full token stream (minus the offending character) is still
/// produced, matching `spec.md §4.1`.
pub struct Scanner<'a> {
	source: Vec<char>,
	start: usize,
	current: usize,
	line: usize,
	tokens: Vec<Token>,
	sink: &'a mut dyn DiagnosticSink,
}

impl<'a> Scanner<'a> {
	#[must_use]
	pub fn new(source: &str, sink: &'a mut dyn DiagnosticSink) -> Self {
		Self {
			source: source.chars().collect(),
			start: 0,
			current: 0,
			line: 1,
			tokens: Vec::new(),
			sink,
		}
	}

	pub fn scan_tokens(mut self) -> Vec<Token> {
		while !self.is_at_end() {
			self.start = self.current;
			self.scan_token();
		}
		self.tokens.push(Token::eof(self.line));
		self.tokens
	}

	fn is_at_end(&self) -> bool {
		self.current >= self.source.len()
	}

	fn advance(&mut self) -> char {
		let c = self.source[self.current];
		self.current += 1;
		c
	}

	fn peek(&self) -> char {
		self.source.get(self.current).copied().unwrap_or('\0')
	}

	fn peek_next(&self) -> char {
		self.source.get(self.current + 1).copied().unwrap_or('\0')
	}

	/// Consumes the next character only if it matches `expected`, used to disambiguate
	/// `! != = == < <= > >=`.
	fn matches(&mut self, expected: char) -> bool {
		if self.is_at_end() || self.source[self.current] != expected {
			return false;
		}
		self.current += 1;
		true
	}

	fn lexeme(&self) -> String {
		self.source[self.start..self.current].iter().collect()
	}

	fn add_token(&mut self, kind: TokenKind, literal: Literal) {
		let lexeme = self.lexeme();
		self.tokens.push(Token::new(kind, lexeme, literal, self.line));
	}

	fn scan_token(&mut self) {
		let c = self.advance();
		match c {
			'(' => self.add_token(TokenKind::LeftParen, Literal::None),
			')' => self.add_token(TokenKind::RightParen, Literal::None),
			'{' => self.add_token(TokenKind::LeftBrace, Literal::None),
			'}' => self.add_token(TokenKind::RightBrace, Literal::None),
			',' => self.add_token(TokenKind::Comma, Literal::None),
			'.' => self.add_token(TokenKind::Dot, Literal::None),
			'-' => self.add_token(TokenKind::Minus, Literal::None),
			'+' => self.add_token(TokenKind::Plus, Literal::None),
			';' => self.add_token(TokenKind::Semicolon, Literal::None),
			'*' => self.add_token(TokenKind::Star, Literal::None),

			'!' => {
				let kind = if self.matches('=') { TokenKind::BangEqual } else { TokenKind::Bang };
				self.add_token(kind, Literal::None);
			}
			'=' => {
				let kind = if self.matches('=') { TokenKind::EqualEqual } else { TokenKind::Equal };
				self.add_token(kind, Literal::None);
			}
			'<' => {
				let kind = if self.matches('=') { TokenKind::LessEqual } else { TokenKind::Less };
				self.add_token(kind, Literal::None);
			}
			'>' => {
				let kind = if self.matches('=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
				self.add_token(kind, Literal::None);
			}

			'/' => {
				if self.matches('/') {
					while self.peek() != '\n' && !self.is_at_end() {
						self.advance();
					}
				} else {
					self.add_token(TokenKind::Slash, Literal::None);
				}
			}

			' ' | '\t' | '\r' => {}
			'\n' => self.line += 1,

			'"' => self.scan_string(),

			other if other.is_ascii_digit() => self.scan_number(),
			other if other.is_ascii_alphabetic() || other == '_' => self.scan_identifier(),

			_ => self.sink.error_at_line(self.line, &format!("Unexpected character: {c}")),
		}
	}

	fn scan_string(&mut self) {
		while self.peek() != '"' && !self.is_at_end() {
			if self.peek() == '\n' {
				self.line += 1;
			}
			self.advance();
		}

		if self.is_at_end() {
			self.sink.error_at_line(self.line, "Unterminated string.");
			return;
		}

		// Consume the closing quote.
		self.advance();

		let value: String = self.source[self.start + 1..self.current - 1].iter().collect();
		self.add_token(TokenKind::String, Literal::Str(value));
	}

	fn scan_number(&mut self) {
		while self.peek().is_ascii_digit() {
			self.advance();
		}

		if self.peek() == '.' && self.peek_next().is_ascii_digit() {
			self.advance(); // Consume the '.'.
			while self.peek().is_ascii_digit() {
				self.advance();
			}
		}

		let text = self.lexeme();
		let value: f64 = text.parse().expect("number lexeme must be valid f64 syntax");
		self.add_token(TokenKind::Number, Literal::Number(value));
	}

	fn scan_identifier(&mut self) {
		while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
			self.advance();
		}

		let text = self.lexeme();
		let kind = KEYWORDS.get(text.as_str()).copied().unwrap_or(TokenKind::Identifier);
		self.add_token(kind, Literal::None);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diagnostics::ConsoleDiagnostics;

	fn scan(source: &str) -> (Vec<Token>, ConsoleDiagnostics) {
		let mut sink = ConsoleDiagnostics::new();
		let tokens = Scanner::new(source, &mut sink).scan_tokens();
		(tokens, sink)
	}

	#[test]
	fn ends_with_single_eof() {
		let (tokens, _) = scan("1 + 2");
		assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
		assert_eq!(tokens.iter().filter(|t| t.kind == TokenKind::Eof).count(), 1);
	}

	#[test]
	fn compound_operators_are_disambiguated() {
		let (tokens, _) = scan("!= == <= >= = < > !");
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
		assert_eq!(
			kinds,
			vec![
				TokenKind::BangEqual,
				TokenKind::EqualEqual,
				TokenKind::LessEqual,
				TokenKind::GreaterEqual,
				TokenKind::Equal,
				TokenKind::Less,
				TokenKind::Greater,
				TokenKind::Bang,
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn line_comment_consumed_without_emitting_a_token() {
		let (tokens, _) = scan("1 // a comment\n2");
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
		assert_eq!(kinds, vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]);
		assert_eq!(tokens[1].line, 2);
	}

	#[test]
	fn string_literal_keeps_embedded_newline_and_bumps_line_count() {
		let (tokens, _) = scan("\"a\nb\" 1");
		assert_eq!(tokens[0].literal, Literal::Str("a\nb".to_owned()));
		assert_eq!(tokens[1].line, 2);
	}

	#[test]
	fn unterminated_string_reports_error_and_emits_no_token() {
		let (tokens, sink) = scan("\"unterminated");
		assert!(sink.had_error());
		assert_eq!(tokens, vec![Token::eof(1)]);
	}

	#[test]
	fn number_literal_decodes_to_f64() {
		let (tokens, _) = scan("3.14");
		assert_eq!(tokens[0].literal, Literal::Number(3.14));
	}

	#[test]
	fn identifier_starting_with_underscore_is_accepted() {
		let (tokens, sink) = scan("_private");
		assert!(!sink.had_error());
		assert_eq!(tokens[0].kind, TokenKind::Identifier);
	}

	#[test]
	fn keyword_table_wins_over_identifier() {
		let (tokens, _) = scan("print and or");
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
		assert_eq!(kinds, vec![TokenKind::Print, TokenKind::And, TokenKind::Or, TokenKind::Eof]);
	}

	#[test]
	fn unrecognized_byte_reports_error_but_keeps_scanning() {
		let (tokens, sink) = scan("1 @ 2");
		assert!(sink.had_error());
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
		assert_eq!(kinds, vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]);
	}

	#[test]
	fn every_non_eof_lexeme_is_a_substring_at_its_line() {
		let source = "var a = 1;\nvar b = 2;";
		let (tokens, _) = scan(source);
		for token in tokens.iter().filter(|t| t.kind != TokenKind::Eof) {
			assert!(source.contains(&token.lexeme), "{:?} not found in source", token);
		}
	}
}
