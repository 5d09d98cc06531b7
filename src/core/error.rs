// SPDX-License-Identifier: MIT OR Apache-2.0

//! SerialFlux Core Error Types
//!
//! Error taxonomy for sequence generation, template evaluation and
//! variable registration.

use thiserror::Error;

/// Result type for sequence engine operations
pub type SequenceResult<T> = Result<T, SequenceError>;

/// Sequence engine error types
#[derive(Error, Debug)]
pub enum SequenceError {
    #[error("Sequence '{name}' not found for tenant '{tenant_id}'")]
    SequenceNotFound { tenant_id: String, name: String },

    #[error("Malformed pattern: {message}")]
    MalformedPattern { message: String },

    #[error("Unknown variable '{name}' in pattern")]
    UnknownVariable { name: String },

    #[error("Variable '{variable}' requires context key '{key}'")]
    MissingRequiredContext { variable: String, key: String },

    #[error("Nested conditionals are not supported: {segment}")]
    NestedConditional { segment: String },

    #[error("Variable '{name}' is already registered")]
    DuplicateVariableRegistration { name: String },

    #[error("Variable name '{name}' is reserved for a built-in")]
    ReservedVariableName { name: String },

    #[error("Invalid variable name '{name}': must match ^[A-Z][A-Z0-9_]*$")]
    InvalidVariableName { name: String },

    #[error("Template '{id}' not found in catalog")]
    TemplateNotFound { id: String },

    #[error("Lock contention on sequence '{name}' for tenant '{tenant_id}'")]
    LockContention { tenant_id: String, name: String },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        config_key: Option<String>,
    },
}

// Custom error creation helpers
impl SequenceError {
    /// Create a sequence not found error
    pub fn sequence_not_found(tenant_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::SequenceNotFound {
            tenant_id: tenant_id.into(),
            name: name.into(),
        }
    }

    /// Create a malformed pattern error
    pub fn malformed_pattern(message: impl Into<String>) -> Self {
        Self::MalformedPattern {
            message: message.into(),
        }
    }

    /// Create an unknown variable error
    pub fn unknown_variable(name: impl Into<String>) -> Self {
        Self::UnknownVariable { name: name.into() }
    }

    /// Create a missing required context error
    pub fn missing_required_context(
        variable: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self::MissingRequiredContext {
            variable: variable.into(),
            key: key.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error with source
    pub fn storage_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            config_key: None,
        }
    }

    /// Create a configuration error with a specific key
    pub fn configuration_with_key(
        message: impl Into<String>,
        config_key: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            config_key: Some(config_key.into()),
        }
    }

    /// Whether the caller may retry the failed operation.
    ///
    /// Lock contention and transient storage failures are retryable; the
    /// engine itself never retries them, so that duplicate-generation
    /// defects cannot hide behind an internal retry loop.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SequenceError::LockContention { .. } | SequenceError::Storage { .. }
        )
    }
}

impl From<rusqlite::Error> for SequenceError {
    fn from(e: rusqlite::Error) -> Self {
        SequenceError::storage_with_source("sqlite operation failed", Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_not_found_error() {
        let error = SequenceError::sequence_not_found("acme", "purchase_order");
        assert!(matches!(error, SequenceError::SequenceNotFound { .. }));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_malformed_pattern_error() {
        let error = SequenceError::malformed_pattern("empty pattern");
        assert!(matches!(error, SequenceError::MalformedPattern { .. }));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(SequenceError::storage("connection dropped").is_retryable());
        assert!(SequenceError::LockContention {
            tenant_id: "acme".into(),
            name: "po".into()
        }
        .is_retryable());
        assert!(!SequenceError::unknown_variable("TIER").is_retryable());
    }

    #[test]
    fn test_missing_required_context_display() {
        let error = SequenceError::missing_required_context("REGION_CODE", "region");
        assert_eq!(
            error.to_string(),
            "Variable 'REGION_CODE' requires context key 'region'"
        );
    }
}
