//! Change-handler registry.
//!
//! One slot per variable name.  A handler carries its expected type as the
//! enum tag; an update is delivered only when the incoming type matches
//! that tag, otherwise it is dropped for dispatch purposes (the cache is
//! still updated by the caller).

use std::collections::HashMap;

use log::debug;

use super::variable::{VarType, parse_bool, parse_float, parse_int};

/// A typed change handler.
///
/// Handlers run synchronously on the sync path and must return promptly.
pub enum Handler {
    Int(Box<dyn FnMut(i32)>),
    Float(Box<dyn FnMut(f32)>),
    Bool(Box<dyn FnMut(bool)>),
    Text(Box<dyn FnMut(&str)>),
}

impl Handler {
    pub fn int(f: impl FnMut(i32) + 'static) -> Self {
        Self::Int(Box::new(f))
    }

    pub fn float(f: impl FnMut(f32) + 'static) -> Self {
        Self::Float(Box::new(f))
    }

    pub fn bool(f: impl FnMut(bool) + 'static) -> Self {
        Self::Bool(Box::new(f))
    }

    pub fn text(f: impl FnMut(&str) + 'static) -> Self {
        Self::Text(Box::new(f))
    }

    /// The variable type this handler expects.
    pub fn var_type(&self) -> VarType {
        match self {
            Self::Int(_) => VarType::Int,
            Self::Float(_) => VarType::Float,
            Self::Bool(_) => VarType::Bool,
            Self::Text(_) => VarType::Text,
        }
    }

    /// Convert `value` and invoke.  Caller has already checked the type.
    fn invoke(&mut self, value: &str) {
        match self {
            Self::Int(f) => f(parse_int(value)),
            Self::Float(f) => f(parse_float(value)),
            Self::Bool(f) => f(parse_bool(value)),
            Self::Text(f) => f(value),
        }
    }
}

impl core::fmt::Debug for Handler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Handler::{:?}", self.var_type())
    }
}

/// Single-slot-per-name handler registry.
#[derive(Debug, Default)]
pub struct CallbackDispatcher {
    entries: HashMap<String, Handler>,
}

impl CallbackDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `name`, replacing any previous entry even if
    /// its type differs.
    pub fn register(&mut self, name: &str, handler: Handler) {
        if let Some(prev) = self.entries.insert(name.to_string(), handler) {
            debug!("Dispatch: replaced {:?} handler for '{}'", prev.var_type(), name);
        }
    }

    /// Remove the handler for `name`.  Returns `true` if one was present.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deliver an update.  Returns `true` if a handler was invoked.
    pub fn dispatch(&mut self, name: &str, var_type: VarType, value: &str) -> bool {
        let Some(handler) = self.entries.get_mut(name) else {
            return false;
        };
        if handler.var_type() != var_type {
            debug!(
                "Dispatch: '{}' arrived as {} but handler expects {}, skipped",
                name,
                var_type,
                handler.var_type()
            );
            return false;
        }
        handler.invoke(value);
        true
    }
}
