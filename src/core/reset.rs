// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reset decisions for sequence counters.
//!
//! Time-based resets fire when `now` falls into a different reset-period
//! boundary than the anchor (`last_reset_at`, or the row's last mutation
//! time if it has never reset). Count-based resets fire when the counter
//! has reached the configured limit. Both checks are always evaluated;
//! they are not mutually exclusive.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

use crate::core::model::{CounterState, ResetPeriod};

pub struct ResetStrategy;

impl ResetStrategy {
    /// Start of the reset period containing `ts`. `Never` has no
    /// boundary and never triggers a time-based reset.
    pub fn reset_boundary(period: ResetPeriod, ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let date = match period {
            ResetPeriod::Never => return None,
            ResetPeriod::Daily => ts.date_naive(),
            ResetPeriod::Monthly => NaiveDate::from_ymd_opt(ts.year(), ts.month(), 1)?,
            ResetPeriod::Yearly => NaiveDate::from_ymd_opt(ts.year(), 1, 1)?,
        };
        let midnight = date.and_hms_opt(0, 0, 0)?;
        Some(Utc.from_utc_datetime(&midnight))
    }

    /// Whether `a` and `b` fall inside the same reset period.
    pub fn is_same_reset_period(
        period: ResetPeriod,
        a: DateTime<Utc>,
        b: DateTime<Utc>,
    ) -> bool {
        match (
            Self::reset_boundary(period, a),
            Self::reset_boundary(period, b),
        ) {
            (Some(ba), Some(bb)) => ba == bb,
            _ => true,
        }
    }

    /// Decide whether the counter must roll back to its initial value.
    pub fn should_reset(
        state: &CounterState,
        period: ResetPeriod,
        limit: Option<u64>,
        now: DateTime<Utc>,
    ) -> bool {
        let anchor = state.last_reset_at.unwrap_or(state.timestamp);
        let time_based = !Self::is_same_reset_period(period, anchor, now);
        let count_based = limit.is_some_and(|l| state.counter >= l);
        time_based || count_based
    }

    /// Counter values left before a count-based reset. Informational
    /// only; never used as a reservation.
    pub fn remaining_until_count_reset(state: &CounterState, limit: Option<u64>) -> Option<u64> {
        limit.map(|l| l.saturating_sub(state.counter))
    }

    /// Time left until the next boundary. Informational only.
    pub fn remaining_until_time_reset(
        period: ResetPeriod,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let next = Self::next_boundary(period, now)?;
        Some(next - now)
    }

    fn next_boundary(period: ResetPeriod, ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let current = Self::reset_boundary(period, ts)?;
        let next = match period {
            ResetPeriod::Never => return None,
            ResetPeriod::Daily => current.date_naive().succ_opt()?,
            ResetPeriod::Monthly => {
                let (year, month) = if current.month() == 12 {
                    (current.year() + 1, 1)
                } else {
                    (current.year(), current.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1)?
            }
            ResetPeriod::Yearly => NaiveDate::from_ymd_opt(current.year() + 1, 1, 1)?,
        };
        let midnight = next.and_hms_opt(0, 0, 0)?;
        Some(Utc.from_utc_datetime(&midnight))
    }
}
