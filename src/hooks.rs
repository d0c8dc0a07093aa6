//! Collaborator hooks: payload validation and change notification.
//!
//! The model never talks to a schema engine or an event bus directly. A
//! node carries at most one `Validator` and one `Notifier`, and copies of
//! the node (clones, new versions, assembled copies) share them.

use std::fmt;
use std::rc::Rc;

use crate::model::{NodeId, Value};

/// Checks a payload before it is stored. An `Err` aborts the write.
pub trait Validator {
    fn validate(&self, payload: &Value) -> Result<(), String>;
}

impl<F> Validator for F
where
    F: Fn(&Value) -> Result<(), String>,
{
    fn validate(&self, payload: &Value) -> Result<(), String> {
        self(payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Updated,
    Cloned,
    Versioned,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub node: NodeId,
    pub before: Option<Value>,
    pub after: Value,
}

/// Receives node lifecycle events, synchronously.
pub trait Notifier {
    fn notify(&self, event: &Event);
}

#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub(crate) validator: Option<Rc<dyn Validator>>,
    pub(crate) notifier: Option<Rc<dyn Notifier>>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("validator", &self.validator.is_some())
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}
