use crate::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// One lexical scope. Scopes form a chain through `enclosing`; closures keep
/// their defining scope alive by holding an `Rc` to it.
#[derive(Default)]
pub struct Environment {
    values: RefCell<IndexMap<Rc<str>, Value>>,
    enclosing: Option<Rc<Environment>>,
}

impl Environment {
    /// A fresh global scope.
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_enclosing(enclosing: Rc<Environment>) -> Rc<Self> {
        Rc::new(Self {
            values: RefCell::new(IndexMap::new()),
            enclosing: Some(enclosing),
        })
    }

    /// Binds `name` in this scope, replacing any existing binding here.
    pub fn define(&self, name: impl Into<Rc<str>>, value: Value) {
        self.values.borrow_mut().insert(name.into(), value);
    }

    /// Looks `name` up from this scope outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.borrow().get(name) {
            return Some(value.clone());
        }
        self.enclosing.as_ref().and_then(|parent| parent.get(name))
    }

    /// Rebinds the nearest existing `name`. Returns `false` when no scope in
    /// the chain defines it; nothing is created in that case.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.borrow_mut().get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.enclosing {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    /// Number of scopes between this one and the global scope.
    pub fn depth(&self) -> usize {
        self.enclosing.as_ref().map_or(0, |parent| parent.depth() + 1)
    }

    /// Names bound directly in this scope, in definition order.
    pub fn local_names(&self) -> Vec<Rc<str>> {
        self.values.borrow().keys().cloned().collect()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.local_names())
            .field("depth", &self.depth())
            .finish()
    }
}
