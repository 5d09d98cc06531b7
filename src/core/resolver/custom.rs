// SPDX-License-Identifier: MIT OR Apache-2.0

//! Custom variable plug-in contract and registry.
//!
//! Custom variables extend the built-in set with tenant-specific
//! resolvers. Resolution must be side-effect-free: a resolver never
//! mutates sequence state and never acquires the sequence lock, since it runs
//! inside the generation critical section.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;

use super::builtin;
use crate::core::error::{SequenceError, SequenceResult};
use crate::core::model::GenerationContext;
use crate::core::validation::ValidationResult;

/// Registrable variable names: `^[A-Z][A-Z0-9_]*$`
static VARIABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("Invalid variable name regex"));

/// A pluggable named resolver.
pub trait CustomVariable: Debug + Send + Sync {
    /// Registered name; must match `^[A-Z][A-Z0-9_]*$`.
    fn name(&self) -> &str;

    /// Context keys that must be present for `resolve` to succeed.
    fn required_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Context keys the variable understands but does not require.
    fn optional_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Resolve the variable to a string. Must be side-effect-free.
    fn resolve(&self, context: &GenerationContext) -> SequenceResult<String>;

    /// Structural pre-check of a context. The default verifies the
    /// declared required keys.
    fn validate(&self, context: &GenerationContext) -> ValidationResult {
        let mut result = ValidationResult::ok();
        for key in self.required_keys() {
            if !context.contains(&key) {
                result.add_error(format!(
                    "variable '{}' requires context key '{}'",
                    self.name(),
                    key
                ));
            }
        }
        result
    }

    /// Regex fragment for the structural matcher. `None` falls back to a
    /// best-effort character class.
    fn matcher_fragment(&self) -> Option<String> {
        None
    }
}

/// Name-keyed registry of custom variables.
#[derive(Debug, Default)]
pub struct VariableRegistry {
    variables: RwLock<HashMap<String, Arc<dyn CustomVariable>>>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable under its declared name.
    ///
    /// Fails if the name is outside the grammar, collides with a
    /// built-in, or is already registered (remove first to replace).
    pub fn register(&self, variable: Arc<dyn CustomVariable>) -> SequenceResult<()> {
        let name = variable.name().to_string();
        if !VARIABLE_NAME_RE.is_match(&name) {
            return Err(SequenceError::InvalidVariableName { name });
        }
        if builtin::is_builtin(&name) {
            return Err(SequenceError::ReservedVariableName { name });
        }
        let mut variables = self.variables.write().unwrap();
        if variables.contains_key(&name) {
            return Err(SequenceError::DuplicateVariableRegistration { name });
        }
        variables.insert(name, variable);
        Ok(())
    }

    /// Remove a registered variable. Returns `true` if it existed.
    pub fn remove(&self, name: &str) -> bool {
        self.variables.write().unwrap().remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CustomVariable>> {
        self.variables.read().unwrap().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.read().unwrap().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.variables.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Custom variable that forwards a context key, optionally transforming
/// case. Covers the common "caller supplies a code, pattern embeds it"
/// shape without a bespoke impl per tenant.
#[derive(Debug, Clone)]
pub struct ContextKeyVariable {
    name: String,
    key: String,
    uppercase: bool,
}

impl ContextKeyVariable {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            uppercase: false,
        }
    }

    pub fn uppercased(mut self) -> Self {
        self.uppercase = true;
        self
    }
}

impl CustomVariable for ContextKeyVariable {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_keys(&self) -> Vec<String> {
        vec![self.key.clone()]
    }

    fn resolve(&self, context: &GenerationContext) -> SequenceResult<String> {
        let value = context.get(&self.key).ok_or_else(|| {
            SequenceError::missing_required_context(&self.name, &self.key)
        })?;
        if self.uppercase {
            Ok(value.to_uppercase())
        } else {
            Ok(value.to_string())
        }
    }

    fn matcher_fragment(&self) -> Option<String> {
        Some("[A-Za-z0-9_-]+".to_string())
    }
}
