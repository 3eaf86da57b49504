//! Output sinks for the `print` statement, split out from the evaluator itself so the
//! pipeline can be exercised in tests without touching real stdout — grounded in
//! `ouros`'s `PrintWriter`/`CollectStringPrint`/`NoPrint` split (`crates/ouros/src/io.rs`).

/// Receives the lines `print` statements emit. Each call is one already-stringified
/// value followed by the newline `spec.md §4.4` mandates.
pub trait Writer {
	fn write_line(&mut self, line: &str);
}

/// The default writer: real stdout.
#[derive(Debug, Default)]
pub struct StdoutWriter;

impl Writer for StdoutWriter {
	fn write_line(&mut self, line: &str) {
		println!("{line}");
	}
}

/// Collects every printed line into a buffer, newline-joined. Used by integration tests
/// that run whole programs and assert on the resulting output.
#[derive(Debug, Default)]
pub struct CollectWriter {
	lines: Vec<String>,
}

impl CollectWriter {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn output(&self) -> String {
		self.lines.join("\n")
	}
}

impl Writer for CollectWriter {
	fn write_line(&mut self, line: &str) {
		self.lines.push(line.to_owned());
	}
}
