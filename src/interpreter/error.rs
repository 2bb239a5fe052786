use crate::diagnostic::{Diagnostic, Label, Span};
use crate::interpreter::parser::ParseError;
use crate::scanner::ScanError;
use std::fmt;

/// The category of a runtime failure, independent of where it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    OperandType,
    UndefinedVariable,
    ArityMismatch,
    IndexBounds,
    NotFound,
    Output,
}

/// An error raised while evaluating a program. Evaluation stops at the first one.
///
/// `line` is 0 when the error was raised away from any source location (for
/// example inside a native function); the interpreter fills it in from the call site.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    OperandType { message: String, line: usize, span: Span },
    UndefinedVariable { name: String, line: usize, span: Span },
    ArityMismatch { callee: Option<String>, expected: usize, found: usize, line: usize, span: Span },
    IndexBounds { index: i64, length: usize, line: usize, span: Span },
    NotFound { message: String, line: usize, span: Span },
    Output { message: String },
}

impl RuntimeError {
    pub fn operand_type(message: impl Into<String>, line: usize, span: Span) -> Self {
        Self::OperandType { message: message.into(), line, span }
    }

    pub fn undefined_variable(name: impl Into<String>, line: usize, span: Span) -> Self {
        Self::UndefinedVariable { name: name.into(), line, span }
    }

    /// `callee` is the function's name, `None` for anonymous functions.
    pub fn arity_mismatch(callee: Option<&str>, expected: usize, found: usize, line: usize, span: Span) -> Self {
        Self::ArityMismatch {
            callee: callee.map(str::to_string),
            expected,
            found,
            line,
            span,
        }
    }

    pub fn index_bounds(index: i64, length: usize, line: usize, span: Span) -> Self {
        Self::IndexBounds { index, length, line, span }
    }

    pub fn not_found(message: impl Into<String>, line: usize, span: Span) -> Self {
        Self::NotFound { message: message.into(), line, span }
    }

    pub fn output(error: &std::io::Error) -> Self {
        Self::Output { message: error.to_string() }
    }

    pub fn kind(&self) -> RuntimeErrorKind {
        match self {
            Self::OperandType { .. } => RuntimeErrorKind::OperandType,
            Self::UndefinedVariable { .. } => RuntimeErrorKind::UndefinedVariable,
            Self::ArityMismatch { .. } => RuntimeErrorKind::ArityMismatch,
            Self::IndexBounds { .. } => RuntimeErrorKind::IndexBounds,
            Self::NotFound { .. } => RuntimeErrorKind::NotFound,
            Self::Output { .. } => RuntimeErrorKind::Output,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::OperandType { line, .. }
            | Self::UndefinedVariable { line, .. }
            | Self::ArityMismatch { line, .. }
            | Self::IndexBounds { line, .. }
            | Self::NotFound { line, .. } => *line,
            Self::Output { .. } => 0,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::OperandType { span, .. }
            | Self::UndefinedVariable { span, .. }
            | Self::ArityMismatch { span, .. }
            | Self::IndexBounds { span, .. }
            | Self::NotFound { span, .. } => *span,
            Self::Output { .. } => Span::dummy(),
        }
    }

    /// Attaches a location if the error does not carry one yet.
    pub fn or_at(mut self, at_line: usize, at_span: Span) -> Self {
        match &mut self {
            Self::OperandType { line, span, .. }
            | Self::UndefinedVariable { line, span, .. }
            | Self::ArityMismatch { line, span, .. }
            | Self::IndexBounds { line, span, .. }
            | Self::NotFound { line, span, .. } => {
                if *line == 0 {
                    *line = at_line;
                    *span = at_span;
                }
            }
            Self::Output { .. } => {}
        }
        self
    }

    /// The bare message, without the line prefix.
    pub fn message(&self) -> String {
        match self {
            Self::OperandType { message, .. } | Self::NotFound { message, .. } => message.clone(),
            Self::UndefinedVariable { name, .. } => format!("Undefined variable '{}'.", name),
            Self::ArityMismatch { expected, found, .. } => {
                format!("Expected {} arguments but got {}.", expected, found)
            }
            Self::IndexBounds { index, length, .. } => {
                format!("Index {} is out of bounds for length {}.", index, length)
            }
            Self::Output { message } => format!("Failed to write output: {}.", message),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let (code, label) = match self {
            Self::UndefinedVariable { .. } => ("E0201", "not found in any enclosing scope"),
            Self::OperandType { .. } => ("E0202", "operand has the wrong type"),
            Self::IndexBounds { .. } => ("E0203", "index out of range"),
            Self::NotFound { .. } => ("E0204", "not found"),
            Self::ArityMismatch { .. } => ("E0205", "called here"),
            Self::Output { .. } => ("E0206", ""),
        };

        let mut diagnostic = Diagnostic::error(self.message()).with_code(code);
        if self.line() > 0 {
            diagnostic = diagnostic
                .with_line(self.line())
                .with_label(Label::primary(self.span(), label));
        }
        if let Self::ArityMismatch {
            callee: Some(name),
            expected,
            ..
        } = self
        {
            let plural = if *expected == 1 { "" } else { "s" };
            diagnostic = diagnostic.with_help(format!("`{}` takes {} argument{}", name, expected, plural));
        }
        diagnostic
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line() {
            0 => write!(f, "Error: {}", self.message()),
            line => write!(f, "[line {}] Error: {}", line, self.message()),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Everything that can stop a source string from running to completion.
#[derive(Debug, Clone)]
pub enum RunError {
    /// The program was never executed.
    Syntax { scan: Vec<ScanError>, parse: Vec<ParseError> },
    Runtime(RuntimeError),
}

impl RunError {
    pub fn is_syntax(&self) -> bool {
        matches!(self, RunError::Syntax { .. })
    }

    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            RunError::Syntax { scan, parse } => scan
                .iter()
                .map(ScanError::to_diagnostic)
                .chain(parse.iter().map(ParseError::to_diagnostic))
                .collect(),
            RunError::Runtime(error) => vec![error.to_diagnostic()],
        }
    }
}

impl From<RuntimeError> for RunError {
    fn from(error: RuntimeError) -> Self {
        RunError::Runtime(error)
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Syntax { scan, parse } => {
                let lines: Vec<String> = scan
                    .iter()
                    .map(ToString::to_string)
                    .chain(parse.iter().map(ToString::to_string))
                    .collect();
                write!(f, "{}", lines.join("\n"))
            }
            RunError::Runtime(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for RunError {}
