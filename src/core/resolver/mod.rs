// SPDX-License-Identifier: MIT OR Apache-2.0

//! Variable resolution: built-ins, custom variables, raw context keys.

pub mod builtin;
pub mod custom;

pub use custom::{ContextKeyVariable, CustomVariable, VariableRegistry};

use chrono::{DateTime, Utc};

use crate::core::error::{SequenceError, SequenceResult};
use crate::core::model::GenerationContext;

/// Resolves variable names for one evaluation pass.
///
/// Precedence: built-ins, then registered custom variables, then raw
/// context keys. Built-in names cannot be shadowed because the registry
/// refuses to register them.
pub struct VariableResolver<'a> {
    pub counter: u64,
    pub padding: usize,
    pub timestamp: DateTime<Utc>,
    pub context: &'a GenerationContext,
    pub registry: &'a VariableRegistry,
}

impl VariableResolver<'_> {
    /// Resolve a variable token, failing on unknown names or unmet
    /// custom-variable requirements.
    pub fn resolve(&self, name: &str, param: Option<&str>) -> SequenceResult<String> {
        if let Some(value) = builtin::resolve(name, param, self.counter, self.padding, self.timestamp)
        {
            return Ok(value);
        }
        if let Some(variable) = self.registry.get(name) {
            for key in variable.required_keys() {
                if !self.context.contains(&key) {
                    return Err(SequenceError::missing_required_context(name, key));
                }
            }
            return variable.resolve(self.context);
        }
        if let Some(value) = self.context.get(name) {
            return Ok(value.to_string());
        }
        Err(SequenceError::unknown_variable(name))
    }

    /// Lenient resolution for conditional conditions: unknown names and
    /// failed custom resolution collapse to `None` (treated as empty).
    pub fn resolve_lenient(&self, name: &str) -> Option<String> {
        if let Some(value) = builtin::resolve(name, None, self.counter, self.padding, self.timestamp)
        {
            return Some(value);
        }
        if let Some(variable) = self.registry.get(name) {
            if let Ok(value) = variable.resolve(self.context) {
                return Some(value);
            }
            return None;
        }
        self.context.get(name).map(|s| s.to_string())
    }
}
