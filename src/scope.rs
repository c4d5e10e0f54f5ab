//! Evaluation context for binding expressions.
//!
//! A component business object never exposes ambient state to its template.
//! Expressions see exactly what the component's [`Scope`] implementation
//! returns, and can only mutate it or call into it through `set` and `call`.

use crate::error::ExpressionError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub trait Scope {
    /// Read a member. `None` means the member does not exist.
    fn get(&self, member: &str) -> Option<Value>;

    fn set(&mut self, member: &str, _value: Value) -> Result<(), ExpressionError> {
        Err(ExpressionError::ReadOnly {
            member: member.to_string(),
        })
    }

    fn call(&mut self, method: &str, _args: &[Value]) -> Result<Value, ExpressionError> {
        Err(ExpressionError::UnknownMethod {
            method: method.to_string(),
        })
    }
}

/// A business object shared between an instance, its bindings and its handlers.
pub type SharedScope = Rc<RefCell<Box<dyn Scope>>>;

pub fn share(scope: Box<dyn Scope>) -> SharedScope {
    Rc::new(RefCell::new(scope))
}

/// Map-backed scope with writable members and no methods.
#[derive(Debug, Clone, Default)]
pub struct MapScope {
    members: HashMap<String, Value>,
}

impl MapScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, member: &str, value: impl Into<Value>) -> Self {
        self.members.insert(member.to_string(), value.into());
        self
    }
}

impl Scope for MapScope {
    fn get(&self, member: &str) -> Option<Value> {
        self.members.get(member).cloned()
    }

    fn set(&mut self, member: &str, value: Value) -> Result<(), ExpressionError> {
        self.members.insert(member.to_string(), value);
        Ok(())
    }
}
