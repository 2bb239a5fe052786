use crate::value::Value;

/// How a statement finished. `Return` unwinds enclosing blocks and loops until
/// the nearest function call consumes it.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlow {
    Next,
    Return(Value),
}
