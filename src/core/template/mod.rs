// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern template value object.
//!
//! A pattern is a format string mixing literal text, variable tokens
//! (`{NAME}` / `{NAME:param}` with `NAME = [A-Z_][A-Z0-9_]*`) and
//! conditional segments (`{?cond?true:false}`). `PatternTemplate` parses
//! a pattern once and answers structural queries; it never touches
//! counter state.

pub mod catalog;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::{SequenceError, SequenceResult};
use crate::core::evaluator::conditional::{scan_conditionals, ConditionalSegment};

/// Maximum accepted pattern length in bytes.
pub const MAX_PATTERN_LEN: usize = 255;

/// Variable token syntax: `{NAME}` or `{NAME:param}`.
///
/// The leading `[A-Z_]` keeps conditional openings (`{?`) and literal
/// lowercase braces out of variable extraction.
pub static VARIABLE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Z_][A-Z0-9_]*)(?::([^}]*))?\}").expect("Invalid variable token regex")
});

/// One `{NAME}` / `{NAME:param}` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableToken {
    pub name: String,
    pub param: Option<String>,
}

/// Parsed, validated pattern string.
#[derive(Debug, Clone)]
pub struct PatternTemplate {
    raw: String,
    variables: Vec<VariableToken>,
    conditionals: Vec<ConditionalSegment>,
}

impl PatternTemplate {
    /// Parse and structurally validate a pattern string.
    ///
    /// Fails with `MalformedPattern` on an empty or over-long pattern,
    /// broken conditional syntax, or an invalid `COUNTER` width. A nested
    /// conditional parses successfully and is carried as a structural
    /// defect (see [`has_nested_conditional`](Self::has_nested_conditional));
    /// evaluation and validation surface it from there.
    pub fn parse(raw: &str) -> SequenceResult<Self> {
        if raw.is_empty() {
            return Err(SequenceError::malformed_pattern("pattern must not be empty"));
        }
        if raw.len() > MAX_PATTERN_LEN {
            return Err(SequenceError::malformed_pattern(format!(
                "pattern length {} exceeds maximum of {}",
                raw.len(),
                MAX_PATTERN_LEN
            )));
        }

        let conditionals = scan_conditionals(raw)?;

        let mut variables = Vec::new();
        for caps in VARIABLE_TOKEN_RE.captures_iter(raw) {
            let name = caps[1].to_string();
            let param = caps.get(2).map(|m| m.as_str().to_string());
            if name == "COUNTER" {
                if let Some(p) = &param {
                    validate_counter_width(p)?;
                }
            }
            variables.push(VariableToken { name, param });
        }

        Ok(Self {
            raw: raw.to_string(),
            variables,
            conditionals,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn variables(&self) -> &[VariableToken] {
        &self.variables
    }

    pub fn conditionals(&self) -> &[ConditionalSegment] {
        &self.conditionals
    }

    /// Whether the pattern references `name` (case-folded) anywhere,
    /// including inside conditional branches.
    pub fn has_variable(&self, name: &str) -> bool {
        let folded = name.to_uppercase();
        self.variables.iter().any(|v| v.name == folded)
    }

    pub fn has_counter(&self) -> bool {
        self.has_variable("COUNTER")
    }

    /// A static pattern renders to itself: no variables, no conditionals.
    pub fn is_static(&self) -> bool {
        self.variables.is_empty() && self.conditionals.is_empty()
    }

    pub fn has_nested_conditional(&self) -> bool {
        self.conditionals.iter().any(|c| c.nested)
    }

    /// Structural complexity heuristic, 0–100. Used for catalog warnings
    /// only, never for correctness.
    pub fn complexity(&self) -> u8 {
        let score =
            self.variables.len() * 10 + self.conditionals.len() * 20 + self.raw.len() / 10;
        score.min(100) as u8
    }
}

fn validate_counter_width(param: &str) -> SequenceResult<()> {
    match param.parse::<usize>() {
        Ok(w) if (1..=64).contains(&w) => Ok(()),
        _ => Err(SequenceError::malformed_pattern(format!(
            "COUNTER width '{}' must be a number between 1 and 64",
            param
        ))),
    }
}
