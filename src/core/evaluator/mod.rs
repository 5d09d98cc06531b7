// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-phase pattern evaluation.
//!
//! Phase one resolves conditional segments (their chosen branch may
//! contain ordinary variable tokens); phase two substitutes variables.
//! The output of phase one is never rescanned for conditionals, which is
//! what makes single-pass resolution an auditable invariant rather than
//! an accident of implementation.

pub mod conditional;
pub mod matcher;

use crate::core::error::SequenceResult;
use crate::core::resolver::VariableResolver;
use crate::core::template::{PatternTemplate, VARIABLE_TOKEN_RE};

/// Renders a concrete string from a template + resolver.
pub struct PatternEvaluator;

impl PatternEvaluator {
    /// Evaluate `template` with the given resolver.
    ///
    /// Conditions resolve leniently (unknown variable → empty string);
    /// variable tokens in the surviving text resolve strictly and fail
    /// with `UnknownVariable` / `MissingRequiredContext`.
    pub fn evaluate(
        template: &PatternTemplate,
        resolver: &VariableResolver<'_>,
    ) -> SequenceResult<String> {
        let resolved =
            conditional::process(template.raw(), |name| resolver.resolve_lenient(name))?;
        Self::substitute_variables(&resolved, resolver)
    }

    fn substitute_variables(
        text: &str,
        resolver: &VariableResolver<'_>,
    ) -> SequenceResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for caps in VARIABLE_TOKEN_RE.captures_iter(text) {
            let Some(full) = caps.get(0) else { continue };
            let name = &caps[1];
            let param = caps.get(2).map(|m| m.as_str());
            out.push_str(&text[cursor..full.start()]);
            out.push_str(&resolver.resolve(name, param)?);
            cursor = full.end();
        }
        out.push_str(&text[cursor..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SequenceError;
    use crate::core::model::GenerationContext;
    use crate::core::resolver::VariableRegistry;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 5, 7).unwrap()
    }

    fn evaluate(pattern: &str, counter: u64, context: &GenerationContext) -> SequenceResult<String> {
        let registry = VariableRegistry::new();
        let resolver = VariableResolver {
            counter,
            padding: 4,
            timestamp: ts(),
            context,
            registry: &registry,
        };
        let template = PatternTemplate::parse(pattern)?;
        PatternEvaluator::evaluate(&template, &resolver)
    }

    #[test]
    fn test_plain_variable_substitution() {
        let out = evaluate("PO-{YEAR}-{COUNTER:4}", 1, &GenerationContext::new()).unwrap();
        assert_eq!(out, "PO-2024-0001");
    }

    #[test]
    fn test_conditional_true_branch_with_tokens() {
        let ctx = GenerationContext::new().with("tier", "VIP");
        let out =
            evaluate("{?TIER=VIP?VIP-{COUNTER:4}:{COUNTER:4}}", 7, &ctx).unwrap();
        assert_eq!(out, "VIP-0007");
    }

    #[test]
    fn test_conditional_false_branch_with_tokens() {
        let ctx = GenerationContext::new().with("tier", "REGULAR");
        let out =
            evaluate("{?TIER=VIP?VIP-{COUNTER:4}:{COUNTER:4}}", 7, &ctx).unwrap();
        assert_eq!(out, "0007");
    }

    #[test]
    fn test_counter_wider_than_padding() {
        let out = evaluate("{COUNTER:4}", 12345, &GenerationContext::new()).unwrap();
        assert_eq!(out, "12345");
    }

    #[test]
    fn test_unknown_variable_in_branch_fails() {
        let ctx = GenerationContext::new().with("tier", "VIP");
        let err = evaluate("{?TIER=VIP?{MYSTERY}:X}", 1, &ctx).unwrap_err();
        assert!(matches!(err, SequenceError::UnknownVariable { .. }));
    }

    #[test]
    fn test_unknown_variable_in_condition_is_falsy() {
        let out = evaluate("{?MYSTERY?A:B}", 1, &GenerationContext::new()).unwrap();
        assert_eq!(out, "B");
    }

    #[test]
    fn test_static_pattern_renders_itself() {
        let out = evaluate("FIXED", 1, &GenerationContext::new()).unwrap();
        assert_eq!(out, "FIXED");
    }

    #[test]
    fn test_counter_condition_uses_builtin() {
        // conditions can observe the post-increment counter
        let out = evaluate("{?COUNTER>=0010?HI:LO}-{COUNTER:4}", 12, &GenerationContext::new())
            .unwrap();
        assert_eq!(out, "HI-0012");
    }
}
