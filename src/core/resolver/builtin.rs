// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in pattern variables.
//!
//! Every built-in is a pure function of the caller-supplied timestamp and
//! the post-increment counter. `COUNTER` accepts a width parameter for
//! zero-padding; padding only pads, it never truncates a counter wider
//! than the requested width.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Names reserved for built-in variables.
pub const BUILTIN_NAMES: &[&str] = &[
    "YEAR",
    "MONTH",
    "DAY",
    "HOUR",
    "MINUTE",
    "SECOND",
    "WEEK",
    "QUARTER",
    "WEEK_YEAR",
    "DAY_OF_WEEK",
    "DAY_OF_YEAR",
    "TIMESTAMP",
    "COUNTER",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Zero-pad `value` to at least `width` digits.
pub fn pad_counter(value: u64, width: usize) -> String {
    format!("{:0width$}", value, width = width)
}

/// Resolve a built-in variable, or `None` if `name` is not a built-in.
///
/// `param` is only meaningful for `COUNTER` (explicit width); other
/// built-ins have fixed widths and ignore it. Without a param, `COUNTER`
/// pads to the sequence's configured `padding`.
pub fn resolve(
    name: &str,
    param: Option<&str>,
    counter: u64,
    padding: usize,
    ts: DateTime<Utc>,
) -> Option<String> {
    let value = match name {
        "YEAR" => format!("{:04}", ts.year()),
        "MONTH" => format!("{:02}", ts.month()),
        "DAY" => format!("{:02}", ts.day()),
        "HOUR" => format!("{:02}", ts.hour()),
        "MINUTE" => format!("{:02}", ts.minute()),
        "SECOND" => format!("{:02}", ts.second()),
        "WEEK" => format!("{:02}", ts.iso_week().week()),
        "QUARTER" => ((ts.month0() / 3) + 1).to_string(),
        "WEEK_YEAR" => format!("{:04}", ts.iso_week().year()),
        "DAY_OF_WEEK" => ts.weekday().number_from_monday().to_string(),
        "DAY_OF_YEAR" => format!("{:03}", ts.ordinal()),
        "TIMESTAMP" => ts.timestamp().to_string(),
        "COUNTER" => {
            let width = param
                .and_then(|p| p.parse::<usize>().ok())
                .unwrap_or(padding);
            pad_counter(counter, width)
        }
        _ => return None,
    };
    Some(value)
}

/// Regex fragment matching the value space of a built-in, for the
/// structural matcher used by `validate()`.
pub fn matcher_fragment(name: &str, param: Option<&str>, padding: usize) -> Option<String> {
    let fragment = match name {
        "YEAR" | "WEEK_YEAR" => r"\d{4}".to_string(),
        "MONTH" | "DAY" | "HOUR" | "MINUTE" | "SECOND" | "WEEK" => r"\d{2}".to_string(),
        "QUARTER" => "[1-4]".to_string(),
        "DAY_OF_WEEK" => "[1-7]".to_string(),
        "DAY_OF_YEAR" => r"\d{3}".to_string(),
        "TIMESTAMP" => r"\d+".to_string(),
        "COUNTER" => {
            let width = param
                .and_then(|p| p.parse::<usize>().ok())
                .unwrap_or(padding)
                .max(1);
            format!(r"\d{{{},}}", width)
        }
        _ => return None,
    };
    Some(fragment)
}
