//! In-memory variable cache.
//!
//! The single source of truth for reads.  Every [`set`](VariableCache::set)
//! is an observable event: after the entry is written the update is handed
//! to the [`CallbackDispatcher`], whether it came from a local write or a
//! remote pull.  The cache and its dispatcher live together so that a
//! mutation and its dispatch are never separated.

use std::collections::HashMap;

use super::dispatch::{CallbackDispatcher, Handler};
use super::variable::{VarType, Variable, parse_bool, parse_float, parse_int};

#[derive(Debug, Default)]
pub struct VariableCache {
    entries: HashMap<String, Variable>,
    dispatcher: CallbackDispatcher,
}

impl VariableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.entries.get(name)
    }

    /// Insert or overwrite `name`, then dispatch the update.
    ///
    /// Type and value are replaced together.  Returns `true` if a handler
    /// was invoked.
    pub fn set(&mut self, name: &str, var_type: VarType, value: &str) -> bool {
        match self.entries.get_mut(name) {
            Some(existing) => {
                existing.var_type = var_type;
                value.clone_into(&mut existing.value);
            }
            None => {
                self.entries.insert(
                    name.to_string(),
                    Variable {
                        name: name.to_string(),
                        var_type,
                        value: value.to_string(),
                    },
                );
            }
        }
        self.dispatcher.dispatch(name, var_type, value)
    }

    /// Register a change handler for `name` (last registration wins).
    pub fn on_change(&mut self, name: &str, handler: Handler) {
        self.dispatcher.register(name, handler);
    }

    // ── Typed readers (never fail) ────────────────────────────

    pub fn read_int(&self, name: &str) -> i32 {
        self.get(name).map_or(0, |v| parse_int(&v.value))
    }

    pub fn read_float(&self, name: &str) -> f32 {
        self.get(name).map_or(0.0, |v| parse_float(&v.value))
    }

    pub fn read_bool(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| parse_bool(&v.value))
    }

    pub fn read_text(&self, name: &str) -> String {
        self.get(name).map(|v| v.value.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over cached variables in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.entries.values()
    }
}
