// SPDX-License-Identifier: MIT OR Apache-2.0

//! SerialFlux sequence / serial-number generation engine.
//!
//! A pattern-template mini-language (variables, padding, conditionals)
//! evaluated against tenant-scoped counters whose increments are
//! exactly-once under concurrent access, with configurable periodic or
//! count-based resets and an append-only generation audit trail.

pub mod core;

pub use crate::core::error::{SequenceError, SequenceResult};
pub use crate::core::model::{
    GenerationContext, LogAction, ResetPeriod, Sequence, SerialNumberLog,
};
pub use crate::core::service::GenerationService;
