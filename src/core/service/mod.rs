// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation orchestration.
//!
//! `GenerationService` composes the reset strategy, the store, the
//! evaluator and the audit trail: reset-check → atomic increment →
//! evaluation → log append, all inside one storage transaction. A
//! counter value is consumed if and only if a log entry exists for it
//! (or an explicit reset/override changed it); evaluation failures roll
//! the increment back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::core::error::{SequenceError, SequenceResult};
use crate::core::evaluator::{matcher, PatternEvaluator};
use crate::core::model::{GenerationContext, Sequence, SerialNumberLog};
use crate::core::reset::ResetStrategy;
use crate::core::resolver::{CustomVariable, VariableRegistry, VariableResolver};
use crate::core::store::SequenceBackend;
use crate::core::template::catalog::{
    InMemoryTemplateCatalog, TemplateCatalog, TemplateEntry, TemplateFilter,
};
use crate::core::template::PatternTemplate;
use crate::core::validation::{validate_pattern, ValidationResult};

pub struct GenerationService {
    backend: Arc<dyn SequenceBackend>,
    registry: Arc<VariableRegistry>,
    catalog: Arc<dyn TemplateCatalog>,
}

impl GenerationService {
    pub fn new(backend: Arc<dyn SequenceBackend>) -> Self {
        Self {
            backend,
            registry: Arc::new(VariableRegistry::new()),
            catalog: Arc::new(InMemoryTemplateCatalog::with_defaults()),
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn TemplateCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_registry(mut self, registry: Arc<VariableRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Arc<VariableRegistry> {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Sequence lifecycle
    // ------------------------------------------------------------------

    /// Create a sequence after structurally validating its pattern.
    pub fn create_sequence(&self, sequence: Sequence) -> SequenceResult<()> {
        let template = PatternTemplate::parse(&sequence.pattern)?;
        if template.has_nested_conditional() {
            return Err(SequenceError::NestedConditional {
                segment: sequence.pattern.clone(),
            });
        }
        info!(
            "creating sequence '{}' for tenant '{}' with pattern '{}'",
            sequence.name, sequence.tenant_id, sequence.pattern
        );
        self.backend.insert(sequence)
    }

    /// Delete a sequence. Its audit entries survive.
    pub fn delete_sequence(&self, tenant_id: &str, name: &str) -> SequenceResult<bool> {
        let deleted = self.backend.delete(tenant_id, name)?;
        if deleted {
            info!("deleted sequence '{}' for tenant '{}'", name, tenant_id);
        }
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    /// Generate the next serial number.
    pub fn generate(
        &self,
        tenant_id: &str,
        name: &str,
        context: &GenerationContext,
    ) -> SequenceResult<String> {
        self.generate_at(tenant_id, name, context, Utc::now())
    }

    /// Generate with an explicit timestamp (reset decision and date
    /// built-ins both observe the same instant).
    pub fn generate_at(
        &self,
        tenant_id: &str,
        name: &str,
        context: &GenerationContext,
        now: DateTime<Utc>,
    ) -> SequenceResult<String> {
        let mut rendered = String::new();

        self.backend.transact(tenant_id, name, &mut |seq| {
            let mut entries = Vec::new();

            // the reset decision shares the increment's critical section:
            // two concurrent callers cannot both decide to reset
            if self.would_reset(seq, now) {
                let count_based = seq.reset_limit.is_some_and(|l| seq.current_value >= l);
                let reason = if count_based {
                    "reset limit reached"
                } else {
                    "reset period boundary crossed"
                };
                seq.current_value = 0;
                seq.last_reset_at = Some(now);
                entries.push(SerialNumberLog::reset(seq.id, 0, now).with_reason(reason));
                info!(
                    "sequence '{}/{}' counter reset: {}",
                    seq.tenant_id, seq.name, reason
                );
            }

            seq.current_value += seq.step_size;
            seq.updated_at = now;
            let counter = seq.current_value;

            let template = PatternTemplate::parse(&seq.pattern)?;
            let resolver = VariableResolver {
                counter,
                padding: seq.padding,
                timestamp: now,
                context,
                registry: self.registry.as_ref(),
            };
            let number = PatternEvaluator::evaluate(&template, &resolver)?;

            entries.push(SerialNumberLog::generated(
                seq.id,
                number.as_str(),
                counter,
                context,
                now,
            ));
            rendered = number;
            Ok(entries)
        })?;

        debug!("generated '{}' for '{}/{}'", rendered, tenant_id, name);
        Ok(rendered)
    }

    /// Advisory next-number computation: no lock, no log entry, no
    /// counter mutation. May differ from the eventual `generate()` under
    /// concurrent activity.
    pub fn preview(
        &self,
        tenant_id: &str,
        name: &str,
        context: &GenerationContext,
    ) -> SequenceResult<String> {
        self.preview_at(tenant_id, name, context, Utc::now())
    }

    pub fn preview_at(
        &self,
        tenant_id: &str,
        name: &str,
        context: &GenerationContext,
        now: DateTime<Utc>,
    ) -> SequenceResult<String> {
        let seq = self.require(tenant_id, name)?;
        let base = if self.would_reset(&seq, now) {
            0
        } else {
            seq.current_value
        };
        let counter = base + seq.step_size;

        let template = PatternTemplate::parse(&seq.pattern)?;
        let resolver = VariableResolver {
            counter,
            padding: seq.padding,
            timestamp: now,
            context,
            registry: self.registry.as_ref(),
        };
        PatternEvaluator::evaluate(&template, &resolver)
    }

    /// Structural check of a candidate against the sequence's pattern.
    pub fn validate(
        &self,
        tenant_id: &str,
        name: &str,
        candidate: &str,
    ) -> SequenceResult<bool> {
        let seq = self.require(tenant_id, name)?;
        let template = PatternTemplate::parse(&seq.pattern)?;
        matcher::matches(&template, seq.padding, self.registry.as_ref(), candidate)
    }

    /// Whether the next `generate` would reset the counter first.
    pub fn needs_reset(&self, tenant_id: &str, name: &str) -> SequenceResult<bool> {
        self.needs_reset_at(tenant_id, name, Utc::now())
    }

    pub fn needs_reset_at(
        &self,
        tenant_id: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> SequenceResult<bool> {
        let seq = self.require(tenant_id, name)?;
        Ok(self.would_reset(&seq, now))
    }

    /// Shared reset decision: the strategy's verdict, gated on the row
    /// actually having something to roll back.
    fn would_reset(&self, seq: &Sequence, now: DateTime<Utc>) -> bool {
        let used = seq.current_value != 0 || seq.last_reset_at.is_some();
        used && ResetStrategy::should_reset(
            &seq.counter_state(),
            seq.reset_period,
            seq.reset_limit,
            now,
        )
    }

    // ------------------------------------------------------------------
    // Explicit counter mutation
    // ------------------------------------------------------------------

    /// Roll the counter back to its initial value.
    pub fn reset(
        &self,
        tenant_id: &str,
        name: &str,
        reason: Option<&str>,
        causer_id: Option<&str>,
    ) -> SequenceResult<Sequence> {
        self.reset_at(tenant_id, name, reason, causer_id, Utc::now())
    }

    pub fn reset_at(
        &self,
        tenant_id: &str,
        name: &str,
        reason: Option<&str>,
        causer_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> SequenceResult<Sequence> {
        let committed = self.backend.transact(tenant_id, name, &mut |seq| {
            seq.current_value = 0;
            seq.last_reset_at = Some(now);
            seq.updated_at = now;
            let mut entry = SerialNumberLog::reset(seq.id, 0, now);
            if let Some(reason) = reason {
                entry = entry.with_reason(reason);
            }
            if let Some(causer) = causer_id {
                entry = entry.with_causer(causer);
            }
            Ok(vec![entry])
        })?;
        info!("sequence '{}/{}' reset to 0", tenant_id, name);
        Ok(committed)
    }

    /// Force the counter to an explicit value.
    pub fn override_counter(
        &self,
        tenant_id: &str,
        name: &str,
        value: u64,
        reason: Option<&str>,
        causer_id: Option<&str>,
    ) -> SequenceResult<Sequence> {
        self.override_counter_at(tenant_id, name, value, reason, causer_id, Utc::now())
    }

    pub fn override_counter_at(
        &self,
        tenant_id: &str,
        name: &str,
        value: u64,
        reason: Option<&str>,
        causer_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> SequenceResult<Sequence> {
        let committed = self.backend.transact(tenant_id, name, &mut |seq| {
            seq.current_value = value;
            seq.updated_at = now;
            let mut entry = SerialNumberLog::overridden(seq.id, value, now);
            if let Some(reason) = reason {
                entry = entry.with_reason(reason);
            }
            if let Some(causer) = causer_id {
                entry = entry.with_causer(causer);
            }
            Ok(vec![entry])
        })?;
        info!(
            "sequence '{}/{}' counter overridden to {}",
            tenant_id, name, value
        );
        Ok(committed)
    }

    // ------------------------------------------------------------------
    // Variable registry
    // ------------------------------------------------------------------

    pub fn register_variable(&self, variable: Arc<dyn CustomVariable>) -> SequenceResult<()> {
        self.registry.register(variable)
    }

    /// Remove a custom variable. Returns `true` if it existed.
    pub fn remove_variable(&self, name: &str) -> bool {
        self.registry.remove(name)
    }

    // ------------------------------------------------------------------
    // Template catalog pass-throughs
    // ------------------------------------------------------------------

    pub fn list_templates(&self, filter: &TemplateFilter) -> Vec<TemplateEntry> {
        self.catalog.list(filter)
    }

    pub fn get_template(&self, id: &str) -> SequenceResult<TemplateEntry> {
        self.catalog
            .get(id)
            .ok_or_else(|| SequenceError::TemplateNotFound { id: id.to_string() })
    }

    /// Render a catalog pattern against an explicit counter, without any
    /// sequence state.
    pub fn preview_template(
        &self,
        id: &str,
        context: &GenerationContext,
        counter: u64,
    ) -> SequenceResult<String> {
        let entry = self.get_template(id)?;
        let template = PatternTemplate::parse(&entry.pattern)?;
        let resolver = VariableResolver {
            counter,
            padding: entry.padding,
            timestamp: Utc::now(),
            context,
            registry: self.registry.as_ref(),
        };
        PatternEvaluator::evaluate(&template, &resolver)
    }

    /// Structured validation of a catalog pattern.
    pub fn validate_template(&self, id: &str) -> ValidationResult {
        match self.catalog.get(id) {
            Some(entry) => validate_pattern(&entry.pattern),
            None => ValidationResult::invalid(format!("template '{}' not found", id)),
        }
    }

    // ------------------------------------------------------------------
    // Audit trail
    // ------------------------------------------------------------------

    /// Audit entries for a live sequence, oldest first.
    pub fn generation_log(
        &self,
        tenant_id: &str,
        name: &str,
    ) -> SequenceResult<Vec<SerialNumberLog>> {
        let seq = self.require(tenant_id, name)?;
        self.backend.entries_for(seq.id)
    }

    /// Audit entries by sequence id, usable after the sequence itself
    /// was deleted.
    pub fn generation_log_by_id(
        &self,
        sequence_id: uuid::Uuid,
    ) -> SequenceResult<Vec<SerialNumberLog>> {
        self.backend.entries_for(sequence_id)
    }

    fn require(&self, tenant_id: &str, name: &str) -> SequenceResult<Sequence> {
        self.backend
            .find(tenant_id, name)?
            .ok_or_else(|| SequenceError::sequence_not_found(tenant_id, name))
    }
}
