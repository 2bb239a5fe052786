pub mod parser;
pub mod environment;
pub mod error;
pub mod control_flow;
pub mod builtins;
pub mod evaluator;
pub mod output;

pub use error::{RunError, RuntimeError, RuntimeErrorKind};
pub use control_flow::ControlFlow;
pub use environment::Environment;
pub use parser::{parse, ParseError, ParseResult, Parser};
pub use builtins::{NativeFunction, NativeTable};
pub use evaluator::{Interpreter, check_source, parse_and_run, parse_and_run_with_diagnostics, run_source};
pub use output::SharedOutput;
