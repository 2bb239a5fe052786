use crate::interpreter::error::RuntimeError;
use crate::interpreter::evaluator::Interpreter;
use crate::value::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// `clock()`: seconds since the Unix epoch as a fractional number.
pub fn builtin_clock(_: &mut Interpreter, _: &[Value]) -> Result<Value, RuntimeError> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0);
    Ok(Value::Number(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic_enough() {
        let mut interpreter = Interpreter::with_output(Vec::new());
        let Ok(Value::Number(first)) = builtin_clock(&mut interpreter, &[]) else {
            panic!("clock should return a number");
        };
        let Ok(Value::Number(second)) = builtin_clock(&mut interpreter, &[]) else {
            panic!("clock should return a number");
        };
        assert!(first > 1_600_000_000.0);
        assert!(second >= first);
    }
}
