//! End-to-end tests driving the full pipeline (scan, parse, resolve, interpret)
//! through the public crate API, one program per scenario from the exit-code and
//! output table the interpreter is specified against.

use plox::diagnostics::{ConsoleDiagnostics, DiagnosticSink};
use plox::interpreter::Interpreter;
use plox::io::CollectWriter;
use plox::parser::Parser;
use plox::resolver::Resolver;
use plox::scanner::Scanner;

struct Outcome {
	output: String,
	exit_code: i32,
}

fn run(source: &str) -> Outcome {
	let mut sink = ConsoleDiagnostics::new();
	let tokens = Scanner::new(source, &mut sink).scan_tokens();
	let program = Parser::new(tokens, &mut sink).parse();

	let mut writer = CollectWriter::new();
	if !sink.had_error() {
		let mut interpreter = Interpreter::new(&mut writer, &mut sink);
		let mut resolver = Resolver::new(&mut interpreter);
		resolver.resolve_program(&program);
		if !interpreter.diagnostics().had_error() {
			interpreter.interpret(&program);
		}
	}

	let exit_code = if sink.had_error() {
		64
	} else if sink.had_runtime_error() {
		70
	} else {
		0
	};
	Outcome { output: writer.output(), exit_code }
}

#[test]
fn arithmetic_expression_prints_and_exits_clean() {
	let outcome = run("print 1 + 2;");
	assert_eq!(outcome.output, "3");
	assert_eq!(outcome.exit_code, 0);
}

#[test]
fn closures_retain_their_own_captured_state() {
	let source = r#"
		fun makeCounter() {
			var count = 0;
			fun increment() {
				count = count + 1;
				return count;
			}
			return increment;
		}
		var counter = makeCounter();
		print counter();
		print counter();
	"#;
	let outcome = run(source);
	assert_eq!(outcome.output, "1\n2");
	assert_eq!(outcome.exit_code, 0);
}

#[test]
fn block_scoped_variable_shadows_global_only_after_its_own_declaration() {
	let source = r#"
		var a = "global";
		{
			fun showA() {
				print a;
			}
			showA();
			var a = "block";
			showA();
		}
	"#;
	let outcome = run(source);
	assert_eq!(outcome.output, "global\nglobal");
	assert_eq!(outcome.exit_code, 0);
}

#[test]
fn duplicate_local_declaration_is_a_compile_time_error() {
	let outcome = run("{ var a = 1; var a = 2; }");
	assert_eq!(outcome.output, "");
	assert_eq!(outcome.exit_code, 64);
}

#[test]
fn adding_a_string_and_a_number_is_a_runtime_type_error() {
	let outcome = run(r#"print "a" + 1;"#);
	assert_eq!(outcome.output, "");
	assert_eq!(outcome.exit_code, 70);
}

#[test]
fn dividing_by_zero_is_a_runtime_error() {
	let outcome = run("print 1 / 0;");
	assert_eq!(outcome.output, "");
	assert_eq!(outcome.exit_code, 70);
}

#[test]
fn function_return_value_is_usable_by_the_caller() {
	let outcome = run(r#"
		fun add(a, b) {
			return a + b;
		}
		print add(2, 3);
	"#);
	assert_eq!(outcome.output, "5");
	assert_eq!(outcome.exit_code, 0);
}

#[test]
fn top_level_return_is_a_compile_time_error() {
	let outcome = run("return 1;");
	assert_eq!(outcome.output, "");
	assert_eq!(outcome.exit_code, 64);
}

#[test]
fn for_loop_desugars_to_a_while_loop_with_initializer_and_increment() {
	let outcome = run(r#"
		var total = 0;
		for (var i = 1; i <= 3; i = i + 1) {
			total = total + i;
		}
		print total;
	"#);
	assert_eq!(outcome.output, "6");
	assert_eq!(outcome.exit_code, 0);
}

#[test]
fn logical_operators_short_circuit_and_return_the_operand_value() {
	let outcome = run(r#"
		print nil or "fallback";
		print "left" and "right";
	"#);
	assert_eq!(outcome.output, "fallback\nright");
	assert_eq!(outcome.exit_code, 0);
}

#[test]
fn calling_a_non_callable_value_is_a_runtime_error() {
	let outcome = run(r#"
		var notAFunction = 1;
		notAFunction();
	"#);
	assert_eq!(outcome.output, "");
	assert_eq!(outcome.exit_code, 70);
}

#[test]
fn undefined_variable_reference_is_a_runtime_error() {
	let outcome = run("print undeclared;");
	assert_eq!(outcome.output, "");
	assert_eq!(outcome.exit_code, 70);
}

#[test]
fn scanner_error_on_unexpected_character_still_reports_parser_errors_from_the_rest() {
	let outcome = run("print 1 @ 2;\nprint 1 + ;");
	assert_eq!(outcome.exit_code, 64);
}

#[test]
fn clock_is_available_as_a_zero_arity_native_function() {
	let outcome = run("print clock() >= 0;");
	assert_eq!(outcome.output, "true");
	assert_eq!(outcome.exit_code, 0);
}
