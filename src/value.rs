use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::interpreter::{ControlFlow, Environment, Interpreter, RuntimeError};
use crate::token::Literal;

/// Anything that can appear in call position: user functions and natives.
pub trait Callable: fmt::Display {
    fn arity(&self) -> usize;

    /// Invoked with exactly `arity()` arguments; the interpreter checks the count first.
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError>;

    fn name(&self) -> Option<&str>;
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Callable(Rc<dyn Callable>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::Number(left), Value::Number(right)) => left == right,
            (Value::Str(left), Value::Str(right)) => left == right,
            (Value::List(left), Value::List(right)) => Rc::ptr_eq(left, right) || *left.borrow() == *right.borrow(),
            (Value::Callable(left), Value::Callable(right)) => std::ptr::addr_eq(Rc::as_ptr(left), Rc::as_ptr(right)),
            _ => false,
        }
    }
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn string(text: impl Into<Rc<str>>) -> Self {
        Value::Str(text.into())
    }

    /// `nil` and `false` are falsy; every other value is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Callable(_) => "function",
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Nil => Value::Nil,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::Str(s) => Value::Str(Rc::clone(s)),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

fn write_element(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Str(s) => write!(f, "\"{}\"", s),
        other => write!(f, "{}", other),
    }
}

/// The `print` form of a value: integral numbers drop the fraction and
/// strings print without quotes except inside lists.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_element(f, item)?;
                }
                write!(f, "]")
            }
            Value::Callable(callable) => write!(f, "{}", callable),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Callable(callable) => write!(f, "Callable({})", callable),
            other => write!(f, "{}", other),
        }
    }
}

/// A user-defined function value together with the scope it was created in.
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<Environment>,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Rc<Environment>) -> Self {
        Self { declaration, closure }
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.declaration.arity()
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        let environment = Environment::with_enclosing(Rc::clone(&self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(Rc::clone(param), argument);
        }

        match interpreter.execute_block(&self.declaration.body, environment)? {
            ControlFlow::Return(value) => Ok(value),
            ControlFlow::Next => Ok(Value::Nil),
        }
    }

    fn name(&self) -> Option<&str> {
        self.declaration.name.as_deref()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.declaration.name {
            Some(name) => write!(f, "<fn {}>", name),
            None => write!(f, "<fn>"),
        }
    }
}
