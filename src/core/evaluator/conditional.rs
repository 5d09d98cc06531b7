// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conditional segment scanning and evaluation.
//!
//! Conditional syntax: `{?condition?trueBranch:falseBranch}` with the
//! false branch optional. The condition is either a bare variable name
//! (truthy = resolved value non-empty) or `VAR OP VALUE` with
//! `OP ∈ {=, !=, >, <, >=, <=, in, not_in}`.
//!
//! Segments are extracted by a hand-rolled scanner rather than a regex:
//! branches legitimately contain `{COUNTER:4}`-style tokens, so the
//! closing brace and the branch separator can only be found by tracking
//! brace depth. Conditionals are resolved in a single pass before
//! variable substitution; a conditional nested inside a branch is flagged
//! and never silently skipped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::{SequenceError, SequenceResult};

/// Condition grammar: bare variable, symbolic operator, or word operator
static CONDITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([A-Za-z_][A-Za-z0-9_]*)\s*(?:(>=|<=|!=|=|>|<)\s*(.*)|\s+(in|not_in)\s+(.*))?$",
    )
    .expect("Invalid condition regex")
});

/// Comparison operator inside a conditional segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    In,
    NotIn,
}

impl ConditionOp {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "=" => Some(ConditionOp::Eq),
            "!=" => Some(ConditionOp::Ne),
            ">" => Some(ConditionOp::Gt),
            "<" => Some(ConditionOp::Lt),
            ">=" => Some(ConditionOp::Ge),
            "<=" => Some(ConditionOp::Le),
            "in" => Some(ConditionOp::In),
            "not_in" => Some(ConditionOp::NotIn),
            _ => None,
        }
    }
}

/// Parsed condition: `TIER=VIP`, `QTY>=10`, `REGION in EU,US`, or bare `TIER`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub variable: String,
    pub comparison: Option<(ConditionOp, String)>,
}

impl Condition {
    /// Parse a condition string. Fails on anything outside the grammar.
    pub fn parse(raw: &str) -> SequenceResult<Self> {
        let trimmed = raw.trim();
        let caps = CONDITION_RE.captures(trimmed).ok_or_else(|| {
            SequenceError::malformed_pattern(format!("invalid condition '{}'", raw))
        })?;

        let variable = caps
            .get(1)
            .map(|m| m.as_str().to_uppercase())
            .unwrap_or_default();

        let comparison = if let Some(op) = caps.get(2) {
            let op = ConditionOp::parse(op.as_str()).ok_or_else(|| {
                SequenceError::malformed_pattern(format!("invalid operator in '{}'", raw))
            })?;
            let value = caps.get(3).map(|m| m.as_str().trim().to_string());
            Some((op, value.unwrap_or_default()))
        } else if let Some(op) = caps.get(4) {
            let op = ConditionOp::parse(op.as_str()).ok_or_else(|| {
                SequenceError::malformed_pattern(format!("invalid operator in '{}'", raw))
            })?;
            let value = caps.get(5).map(|m| m.as_str().trim().to_string());
            Some((op, value.unwrap_or_default()))
        } else {
            None
        };

        Ok(Condition {
            variable,
            comparison,
        })
    }

    /// Evaluate the condition against a resolver for the variable's value.
    ///
    /// A variable that resolves to `None` is treated as the empty string:
    /// the bare form is falsy and comparisons proceed against `""`.
    /// Numeric operators evaluate to false unless both operands are
    /// numeric. Equality and list membership compare case-insensitively,
    /// consistent with the case-insensitive context map.
    pub fn evaluate<F>(&self, resolve: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        let actual = resolve(&self.variable).unwrap_or_default();
        let Some((op, expected)) = &self.comparison else {
            return !actual.is_empty();
        };

        match op {
            ConditionOp::Eq => actual.eq_ignore_ascii_case(expected),
            ConditionOp::Ne => !actual.eq_ignore_ascii_case(expected),
            ConditionOp::Gt | ConditionOp::Lt | ConditionOp::Ge | ConditionOp::Le => {
                let (Ok(a), Ok(b)) = (actual.parse::<f64>(), expected.parse::<f64>()) else {
                    return false;
                };
                match op {
                    ConditionOp::Gt => a > b,
                    ConditionOp::Lt => a < b,
                    ConditionOp::Ge => a >= b,
                    ConditionOp::Le => a <= b,
                    _ => unreachable!(),
                }
            }
            ConditionOp::In | ConditionOp::NotIn => {
                let found = expected
                    .split(',')
                    .map(str::trim)
                    .any(|item| item.eq_ignore_ascii_case(&actual));
                match op {
                    ConditionOp::In => found,
                    _ => !found,
                }
            }
        }
    }
}

/// One `{?condition?true:false}` segment extracted from a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalSegment {
    /// Full segment text including the enclosing braces.
    pub raw: String,
    pub condition: String,
    pub true_branch: String,
    pub false_branch: String,
    /// Byte span of the segment within the pattern.
    pub span: (usize, usize),
    /// A `{?` occurs inside a branch. Nesting is rejected, not resolved.
    pub nested: bool,
}

/// Extract all conditional segments from a pattern.
///
/// Structural breakage (unterminated segment, missing `?` separator) is a
/// `MalformedPattern` error; a *nested* conditional is well-formed enough
/// to locate and is reported via the `nested` flag so validation entry
/// points can surface it without exception-driven control flow.
pub fn scan_conditionals(pattern: &str) -> SequenceResult<Vec<ConditionalSegment>> {
    let bytes = pattern.as_bytes();
    let mut segments = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'{' && i + 1 < bytes.len() && bytes[i + 1] == b'?' {
            let start = i;
            let mut depth = 1usize;
            let mut j = i + 2;
            let mut end = None;
            let mut nested = false;
            while j < bytes.len() {
                match bytes[j] {
                    b'{' => {
                        if j + 1 < bytes.len() && bytes[j + 1] == b'?' {
                            nested = true;
                        }
                        depth += 1;
                    }
                    b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            end = Some(j);
                            break;
                        }
                    }
                    _ => {}
                }
                j += 1;
            }
            let end = end.ok_or_else(|| {
                SequenceError::malformed_pattern(format!(
                    "unterminated conditional starting at byte {}",
                    start
                ))
            })?;

            let body = &pattern[start + 2..end];
            let segment = parse_segment(&pattern[start..=end], body, (start, end + 1), nested)?;
            segments.push(segment);
            i = end + 1;
        } else {
            i += 1;
        }
    }

    Ok(segments)
}

fn parse_segment(
    raw: &str,
    body: &str,
    span: (usize, usize),
    nested: bool,
) -> SequenceResult<ConditionalSegment> {
    let sep = body.find('?').ok_or_else(|| {
        SequenceError::malformed_pattern(format!(
            "conditional '{}' is missing the '?' branch separator",
            raw
        ))
    })?;
    let condition = body[..sep].trim().to_string();
    if condition.is_empty() {
        return Err(SequenceError::malformed_pattern(format!(
            "conditional '{}' has an empty condition",
            raw
        )));
    }

    let branches = &body[sep + 1..];
    let (true_branch, false_branch) = split_branches(branches);

    Ok(ConditionalSegment {
        raw: raw.to_string(),
        condition,
        true_branch: true_branch.to_string(),
        false_branch: false_branch.to_string(),
        span,
        nested,
    })
}

/// Split branches at the first `:` outside `{...}` tokens. The colon in
/// `{COUNTER:4}` sits at brace depth one and is never a branch separator.
fn split_branches(branches: &str) -> (&str, &str) {
    let bytes = branches.as_bytes();
    let mut depth = 0usize;
    for (idx, b) in bytes.iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b':' if depth == 0 => return (&branches[..idx], &branches[idx + 1..]),
            _ => {}
        }
    }
    (branches, "")
}

/// Single-pass conditional resolution.
///
/// Every segment is replaced by its chosen branch; the output is never
/// rescanned, which keeps resolution decidable in one pass. Fails with
/// `NestedConditional` if any segment carries a nested conditional.
pub fn process<F>(pattern: &str, resolve: F) -> SequenceResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let segments = scan_conditionals(pattern)?;
    if segments.is_empty() {
        return Ok(pattern.to_string());
    }

    let mut out = String::with_capacity(pattern.len());
    let mut cursor = 0;
    for segment in &segments {
        if segment.nested {
            return Err(SequenceError::NestedConditional {
                segment: segment.raw.clone(),
            });
        }
        out.push_str(&pattern[cursor..segment.span.0]);
        let condition = Condition::parse(&segment.condition)?;
        if condition.evaluate(&resolve) {
            out.push_str(&segment.true_branch);
        } else {
            out.push_str(&segment.false_branch);
        }
        cursor = segment.span.1;
    }
    out.push_str(&pattern[cursor..]);
    Ok(out)
}
