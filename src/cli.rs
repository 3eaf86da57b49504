use std::io::Write as _;
use std::path::PathBuf;

use clap::Parser as ClapParser;

use crate::diagnostics::ConsoleDiagnostics;
use crate::interpreter::Interpreter;
use crate::io::StdoutWriter;
use crate::parser::Parser as LoxParser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// A tree-walking interpreter for Lox.
#[derive(clap::Parser)]
#[command(name = "plox")]
pub struct Args {
	/// Script to run. Omit to start an interactive REPL.
	script: Option<PathBuf>,
}

/// Runs the pipeline (scan, parse, resolve, interpret) once over `source`, driving
/// `sink`/`writer`. Shared between file mode and each REPL line.
fn run(source: &str, writer: &mut dyn crate::io::Writer, sink: &mut ConsoleDiagnostics) {
	let tokens = Scanner::new(source, sink).scan_tokens();
	let program = LoxParser::new(tokens, sink).parse();
	if sink.had_error() {
		return;
	}

	let mut interpreter = Interpreter::new(writer, sink);
	let mut resolver = Resolver::new(&mut interpreter);
	resolver.resolve_program(&program);
	if interpreter.diagnostics().had_error() {
		return;
	}
	interpreter.interpret(&program);
}

/// Reads and interprets a whole file. Returns the process exit code: `0` on success,
/// `64` if the file failed to parse or resolve, `70` if it failed at runtime
/// (`spec.md §6`).
fn run_file(path: &PathBuf) -> anyhow::Result<i32> {
	let source = std::fs::read_to_string(path)?;
	let mut writer = StdoutWriter;
	let mut sink = ConsoleDiagnostics::new();
	run(&source, &mut writer, &mut sink);

	if sink.had_error() {
		Ok(64)
	} else if sink.had_runtime_error() {
		Ok(70)
	} else {
		Ok(0)
	}
}

/// Interactive REPL: one line per evaluation. `had_error` resets between lines so a
/// mistyped line doesn't poison the rest of the session, but `had_runtime_error`
/// persists for the whole process (`spec.md §9`, matching the original `lox.py`'s
/// behavior).
fn run_prompt() -> anyhow::Result<i32> {
	let mut writer = StdoutWriter;
	let mut sink = ConsoleDiagnostics::new();
	let stdin = std::io::stdin();

	loop {
		print!("> ");
		std::io::stdout().flush()?;

		let mut line = String::new();
		if stdin.read_line(&mut line)? == 0 {
			break;
		}

		run(&line, &mut writer, &mut sink);
		sink.reset_error();
	}

	Ok(if sink.had_runtime_error() { 70 } else { 0 })
}

/// Parses command-line arguments and runs the interpreter, returning the process exit
/// code. More than one positional argument is a `clap` usage error, mapped to `64`
/// (`spec.md §6`).
pub fn main() -> anyhow::Result<i32> {
	let args = match Args::try_parse() {
		Ok(args) => args,
		Err(error) => {
			error.print()?;
			return Ok(64);
		}
	};

	match args.script {
		Some(path) => run_file(&path),
		None => run_prompt(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::io::CollectWriter;

	fn run_source(source: &str) -> (String, i32) {
		let mut writer = CollectWriter::new();
		let mut sink = ConsoleDiagnostics::new();
		run(source, &mut writer, &mut sink);
		let code = if sink.had_error() {
			64
		} else if sink.had_runtime_error() {
			70
		} else {
			0
		};
		(writer.output(), code)
	}

	#[test]
	fn successful_program_exits_zero() {
		let (output, code) = run_source("print 1 + 2;");
		assert_eq!(output, "3");
		assert_eq!(code, 0);
	}

	#[test]
	fn duplicate_local_declaration_exits_sixty_four() {
		let (_, code) = run_source("{ var a = 1; var a = 2; }");
		assert_eq!(code, 64);
	}

	#[test]
	fn type_mismatch_exits_seventy() {
		let (_, code) = run_source(r#"print "a" + 1;"#);
		assert_eq!(code, 70);
	}

	#[test]
	fn top_level_return_exits_sixty_four() {
		let (_, code) = run_source("return 1;");
		assert_eq!(code, 64);
	}
}
