// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only audit records for generation activity.
//!
//! Log entries are never mutated or deleted by the engine and survive
//! deletion of the sequence they reference (retention is an external
//! concern). Entries are hash-chained by the log store for tamper
//! evidence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::GenerationContext;

/// What a serial number log entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogAction {
    Generated,
    Overridden,
    Reset,
}

impl LogAction {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogAction::Generated => "generated",
            LogAction::Overridden => "overridden",
            LogAction::Reset => "reset",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "generated" => Ok(LogAction::Generated),
            "overridden" => Ok(LogAction::Overridden),
            "reset" => Ok(LogAction::Reset),
            _ => Err(format!("Invalid log action '{}'", s)),
        }
    }
}

/// Immutable audit record of one counter-affecting action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialNumberLog {
    pub id: Uuid,
    pub sequence_id: Uuid,
    pub generated_number: String,
    pub counter_value: u64,
    pub context: serde_json::Value,
    pub action: LogAction,
    pub reason: Option<String>,
    pub causer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Chain hash, assigned by the log store on append.
    pub hash: String,
}

impl SerialNumberLog {
    fn entry(
        sequence_id: Uuid,
        action: LogAction,
        generated_number: impl Into<String>,
        counter_value: u64,
        context: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence_id,
            generated_number: generated_number.into(),
            counter_value,
            context,
            action,
            reason: None,
            causer_id: None,
            created_at,
            hash: String::new(),
        }
    }

    /// Record a successful generation.
    pub fn generated(
        sequence_id: Uuid,
        generated_number: impl Into<String>,
        counter_value: u64,
        context: &GenerationContext,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::entry(
            sequence_id,
            LogAction::Generated,
            generated_number,
            counter_value,
            context.snapshot(),
            created_at,
        )
    }

    /// Record an explicit counter override.
    pub fn overridden(
        sequence_id: Uuid,
        counter_value: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::entry(
            sequence_id,
            LogAction::Overridden,
            counter_value.to_string(),
            counter_value,
            serde_json::Value::Object(serde_json::Map::new()),
            created_at,
        )
    }

    /// Record a counter reset (explicit or boundary-triggered).
    pub fn reset(sequence_id: Uuid, counter_value: u64, created_at: DateTime<Utc>) -> Self {
        Self::entry(
            sequence_id,
            LogAction::Reset,
            counter_value.to_string(),
            counter_value,
            serde_json::Value::Object(serde_json::Map::new()),
            created_at,
        )
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_causer(mut self, causer_id: impl Into<String>) -> Self {
        self.causer_id = Some(causer_id.into());
        self
    }
}
