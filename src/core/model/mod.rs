// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model for the sequence engine.
//!
//! `Sequence` is the persisted counter-plus-pattern configuration,
//! `SerialNumberLog` the immutable audit record, `GenerationContext` the
//! per-call variable map, `CounterState` an ephemeral snapshot used only
//! inside reset computation.

mod context;
mod log;

pub use context::GenerationContext;
pub use log::{LogAction, SerialNumberLog};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Periodic reset cadence for a sequence counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResetPeriod {
    #[default]
    Never,
    Daily,
    Monthly,
    Yearly,
}

impl ResetPeriod {
    /// Parse reset period from string (case-insensitive)
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "never" => Ok(ResetPeriod::Never),
            "daily" => Ok(ResetPeriod::Daily),
            "monthly" => Ok(ResetPeriod::Monthly),
            "yearly" => Ok(ResetPeriod::Yearly),
            _ => Err(format!(
                "Invalid reset period '{}'. Valid values: 'never', 'daily', 'monthly', 'yearly'",
                s
            )),
        }
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResetPeriod::Never => "never",
            ResetPeriod::Daily => "daily",
            ResetPeriod::Monthly => "monthly",
            ResetPeriod::Yearly => "yearly",
        }
    }
}

/// Tenant-scoped counter + pattern configuration.
///
/// `current_value` never decreases except through an explicit reset or
/// override; `version` increments on every committed mutation and is the
/// optimistic-concurrency token for storage backends that need one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    pub id: Uuid,
    pub tenant_id: String,
    pub name: String,
    pub pattern: String,
    pub reset_period: ResetPeriod,
    pub reset_limit: Option<u64>,
    pub padding: usize,
    pub step_size: u64,
    pub current_value: u64,
    pub last_reset_at: Option<DateTime<Utc>>,
    pub version: u64,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sequence {
    /// Create a fresh sequence with counter at zero and version zero.
    pub fn new(
        tenant_id: impl Into<String>,
        name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            pattern: pattern.into(),
            reset_period: ResetPeriod::Never,
            reset_limit: None,
            padding: 4,
            step_size: 1,
            current_value: 0,
            last_reset_at: None,
            version: 0,
            metadata: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_reset_period(mut self, period: ResetPeriod) -> Self {
        self.reset_period = period;
        self
    }

    pub fn with_reset_limit(mut self, limit: u64) -> Self {
        self.reset_limit = Some(limit);
        self
    }

    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_step_size(mut self, step_size: u64) -> Self {
        self.step_size = step_size;
        self
    }

    /// Ephemeral counter snapshot used by reset computation.
    pub fn counter_state(&self) -> CounterState {
        CounterState {
            counter: self.current_value,
            timestamp: self.updated_at,
            last_reset_at: self.last_reset_at,
        }
    }
}

/// Point-in-time counter snapshot.
///
/// Not a stored entity; `timestamp` is the row's last mutation time and
/// anchors the time-based reset boundary when the sequence has never
/// been reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    pub counter: u64,
    pub timestamp: DateTime<Utc>,
    pub last_reset_at: Option<DateTime<Utc>>,
}
