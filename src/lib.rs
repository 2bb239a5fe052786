pub mod ast;
pub mod cli;
pub mod config;
pub mod diagnostic;
pub mod interpreter;
pub mod scanner;
pub mod token;
pub mod value;

pub use ast::{Expr, ExprKind, Stmt};
pub use interpreter::{parse, parse_and_run, run_source, Interpreter, RunError, RuntimeError};
pub use scanner::scan;
pub use token::{Literal, Token, TokenKind};
pub use value::Value;
