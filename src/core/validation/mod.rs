// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured validation for pattern strings.
//!
//! Validation entry points always return a [`ValidationResult`] instead
//! of failing, so callers can batch-validate template catalogs without
//! exception-driven control flow.

use crate::core::evaluator::conditional::{scan_conditionals, Condition};
use crate::core::template::{PatternTemplate, MAX_PATTERN_LEN, VARIABLE_TOKEN_RE};

/// Outcome of a validation entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        let mut result = Self::ok();
        result.add_error(error);
        result
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Fold another result into this one. Errors dominate.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.is_valid = self.errors.is_empty();
    }
}

/// Validate the conditional segments of a pattern.
///
/// Reports broken segment syntax, conditions outside the grammar, and
/// nested conditionals (`nested conditionals are not supported` is a
/// reported error here, never a thrown one).
pub fn validate_conditional_syntax(pattern: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();

    let segments = match scan_conditionals(pattern) {
        Ok(segments) => segments,
        Err(e) => {
            result.add_error(e.to_string());
            return result;
        }
    };

    for segment in &segments {
        if segment.nested {
            result.add_error(format!(
                "nested conditionals are not supported: '{}'",
                segment.raw
            ));
            continue;
        }
        if let Err(e) = Condition::parse(&segment.condition) {
            result.add_error(e.to_string());
        }
        if segment.true_branch.is_empty() && segment.false_branch.is_empty() {
            result.add_warning(format!(
                "conditional '{}' has empty branches and renders nothing",
                segment.raw
            ));
        }
    }

    result
}

/// Full structural validation of a pattern string.
pub fn validate_pattern(pattern: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();

    if pattern.is_empty() {
        result.add_error("pattern must not be empty");
        return result;
    }
    if pattern.len() > MAX_PATTERN_LEN {
        result.add_error(format!(
            "pattern length {} exceeds maximum of {}",
            pattern.len(),
            MAX_PATTERN_LEN
        ));
    }

    result.merge(validate_conditional_syntax(pattern));

    for caps in VARIABLE_TOKEN_RE.captures_iter(pattern) {
        if &caps[1] == "COUNTER" {
            if let Some(param) = caps.get(2) {
                let width = param.as_str().parse::<usize>().ok();
                if !matches!(width, Some(1..=64)) {
                    result.add_error(format!(
                        "COUNTER width '{}' must be a number between 1 and 64",
                        param.as_str()
                    ));
                }
            }
        }
    }

    if result.is_valid {
        if let Ok(template) = PatternTemplate::parse(pattern) {
            if !template.has_counter() {
                result.add_warning(
                    "pattern has no {COUNTER} token; generated numbers may repeat".to_string(),
                );
            }
            if template.complexity() > 80 {
                result.add_warning(format!(
                    "pattern complexity {} is high; consider simplifying",
                    template.complexity()
                ));
            }
        }
    }

    result
}
