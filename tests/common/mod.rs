#![allow(dead_code)]

use hype::interpreter::{run_source, Interpreter, ParseError, RunError, RuntimeError, SharedOutput};
use hype::scanner::ScanError;

/// Runs `source` and returns everything it printed. Panics on any error.
pub fn run(source: &str) -> String {
    match hype::parse_and_run(source) {
        Ok(output) => output,
        Err(error) => panic!("program failed:\n{}\n---\n{}", source, error),
    }
}

pub fn run_lines(source: &str) -> Vec<String> {
    run(source).lines().map(str::to_string).collect()
}

/// Runs `source` and returns what was printed before it stopped, plus the outcome.
pub fn run_partial(source: &str) -> (String, Result<(), RunError>) {
    let output = SharedOutput::new();
    let mut interpreter = Interpreter::with_output(output.clone());
    let result = run_source(source, &mut interpreter);
    (output.contents(), result)
}

pub fn runtime_error(source: &str) -> RuntimeError {
    match run_partial(source).1 {
        Err(RunError::Runtime(error)) => error,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

pub fn syntax_errors(source: &str) -> (Vec<ScanError>, Vec<ParseError>) {
    match run_partial(source).1 {
        Err(RunError::Syntax { scan, parse }) => (scan, parse),
        other => panic!("expected syntax errors, got {:?}", other),
    }
}
