// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structural matcher for validating candidate serial numbers.
//!
//! Rebuilds an anchored regex from a pattern: `{COUNTER}` becomes
//! `\d{padding,}`, date built-ins become their fixed-width digit runs,
//! custom variables contribute their declared fragment (or a best-effort
//! character class), conditionals become a branch alternation, literal
//! text is escaped. The matcher is structural only: it cannot check
//! which branch a historical number took.

use regex::Regex;

use crate::core::error::{SequenceError, SequenceResult};
use crate::core::resolver::{builtin, VariableRegistry};
use crate::core::template::{PatternTemplate, VARIABLE_TOKEN_RE};

/// Fallback fragment for variables whose value space is unknown
/// (context-supplied or custom without a declared fragment).
static BEST_EFFORT_FRAGMENT: &str = "[A-Za-z0-9_-]+";

/// Build an anchored structural matcher for `template`.
pub fn build_matcher(
    template: &PatternTemplate,
    padding: usize,
    registry: &VariableRegistry,
) -> SequenceResult<Regex> {
    let pattern = template.raw();
    let mut body = String::with_capacity(pattern.len() * 2);
    let mut cursor = 0;

    for segment in template.conditionals() {
        if segment.nested {
            return Err(SequenceError::NestedConditional {
                segment: segment.raw.clone(),
            });
        }
        body.push_str(&fragment_for_text(
            &pattern[cursor..segment.span.0],
            padding,
            registry,
        ));
        let true_re = fragment_for_text(&segment.true_branch, padding, registry);
        if segment.false_branch.is_empty() {
            body.push_str(&format!("(?:{})?", true_re));
        } else {
            let false_re = fragment_for_text(&segment.false_branch, padding, registry);
            body.push_str(&format!("(?:{}|{})", true_re, false_re));
        }
        cursor = segment.span.1;
    }
    body.push_str(&fragment_for_text(&pattern[cursor..], padding, registry));

    Regex::new(&format!("^{}$", body)).map_err(|e| {
        SequenceError::malformed_pattern(format!("cannot build structural matcher: {}", e))
    })
}

/// Convert branch/literal text (variables + literals, no conditionals)
/// into a regex fragment.
fn fragment_for_text(text: &str, padding: usize, registry: &VariableRegistry) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut cursor = 0;
    for caps in VARIABLE_TOKEN_RE.captures_iter(text) {
        let Some(full) = caps.get(0) else { continue };
        let name = &caps[1];
        let param = caps.get(2).map(|m| m.as_str());
        out.push_str(&regex::escape(&text[cursor..full.start()]));
        out.push_str(&variable_fragment(name, param, padding, registry));
        cursor = full.end();
    }
    out.push_str(&regex::escape(&text[cursor..]));
    out
}

fn variable_fragment(
    name: &str,
    param: Option<&str>,
    padding: usize,
    registry: &VariableRegistry,
) -> String {
    if let Some(fragment) = builtin::matcher_fragment(name, param, padding) {
        return fragment;
    }
    if let Some(variable) = registry.get(name) {
        if let Some(fragment) = variable.matcher_fragment() {
            return fragment;
        }
    }
    BEST_EFFORT_FRAGMENT.to_string()
}

/// Quick check used by tests and `GenerationService::validate`.
pub fn matches(
    template: &PatternTemplate,
    padding: usize,
    registry: &VariableRegistry,
    candidate: &str,
) -> SequenceResult<bool> {
    Ok(build_matcher(template, padding, registry)?.is_match(candidate))
}
