//! Native functions installed into the global scope.
//!
//! The table is built once per interpreter and bound by name before any user
//! code runs, so scripts can shadow a native by redefining its name.

mod clock;

pub use clock::builtin_clock;

use super::environment::Environment;
use super::error::RuntimeError;
use super::evaluator::Interpreter;
use crate::value::{Callable, Value};
use std::fmt;
use std::rc::Rc;

pub type NativeFn = fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>;

/// A host function exposed to scripts.
pub struct NativeFunction {
    name: &'static str,
    arity: usize,
    function: NativeFn,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, function: NativeFn) -> Self {
        Self { name, arity, function }
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        (self.function)(interpreter, &arguments)
    }

    fn name(&self) -> Option<&str> {
        Some(self.name)
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

#[derive(Default)]
pub struct NativeTable {
    entries: Vec<Rc<NativeFunction>>,
}

impl NativeTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The natives every interpreter starts with.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register("clock", 0, builtin_clock);
        table
    }

    /// Adds a native, replacing an earlier one with the same name.
    pub fn register(&mut self, name: &'static str, arity: usize, function: NativeFn) -> &mut Self {
        self.entries.retain(|entry| entry.name != name);
        self.entries.push(Rc::new(NativeFunction::new(name, arity, function)));
        self
    }

    pub fn get(&self, name: &str) -> Option<Rc<NativeFunction>> {
        self.entries.iter().find(|entry| entry.name == name).cloned()
    }

    pub fn install(&self, globals: &Environment) {
        for entry in &self.entries {
            let callable: Rc<dyn Callable> = Rc::clone(entry) as Rc<dyn Callable>;
            globals.define(entry.name, Value::Callable(callable));
        }
    }
}
