// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage backend.
//!
//! Rows live behind per-row mutexes indexed by (tenant_id, name); the
//! audit trail is a single hash-chained vector. Suitable for tests and
//! single-process deployments.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use uuid::Uuid;

use super::{chain_hash, SequenceMutation, SequenceStore, SerialNumberLogStore, GENESIS_HASH};
use crate::core::error::{SequenceError, SequenceResult};
use crate::core::model::{Sequence, SerialNumberLog};

type RowKey = (String, String);

pub struct InMemorySequenceStore {
    rows: DashMap<RowKey, Arc<Mutex<Sequence>>>,
    logs: Mutex<Vec<SerialNumberLog>>,
    last_hash: Mutex<String>,
}

impl Default for InMemorySequenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySequenceStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            logs: Mutex::new(Vec::new()),
            last_hash: Mutex::new(GENESIS_HASH.to_string()),
        }
    }

    fn key(tenant_id: &str, name: &str) -> RowKey {
        (tenant_id.to_string(), name.to_string())
    }

    fn row(&self, tenant_id: &str, name: &str) -> SequenceResult<Arc<Mutex<Sequence>>> {
        self.rows
            .get(&Self::key(tenant_id, name))
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| SequenceError::sequence_not_found(tenant_id, name))
    }

    fn contention(tenant_id: &str, name: &str) -> SequenceError {
        SequenceError::LockContention {
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
        }
    }
}

impl SequenceStore for InMemorySequenceStore {
    fn find(&self, tenant_id: &str, name: &str) -> SequenceResult<Option<Sequence>> {
        match self.rows.get(&Self::key(tenant_id, name)) {
            Some(row) => {
                let guard = row
                    .lock()
                    .map_err(|_| Self::contention(tenant_id, name))?;
                Ok(Some(guard.clone()))
            }
            None => Ok(None),
        }
    }

    fn insert(&self, sequence: Sequence) -> SequenceResult<()> {
        let key = Self::key(&sequence.tenant_id, &sequence.name);
        match self.rows.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(SequenceError::storage(format!(
                "sequence '{}' already exists for tenant '{}'",
                sequence.name, sequence.tenant_id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(sequence)));
                Ok(())
            }
        }
    }

    fn delete(&self, tenant_id: &str, name: &str) -> SequenceResult<bool> {
        Ok(self.rows.remove(&Self::key(tenant_id, name)).is_some())
    }

    fn transact(
        &self,
        tenant_id: &str,
        name: &str,
        work: &mut SequenceMutation<'_>,
    ) -> SequenceResult<Sequence> {
        let row = self.row(tenant_id, name)?;
        let mut guard = row
            .lock()
            .map_err(|_| Self::contention(tenant_id, name))?;

        // the row may have been deleted between lookup and lock
        if !self.rows.contains_key(&Self::key(tenant_id, name)) {
            return Err(SequenceError::sequence_not_found(tenant_id, name));
        }

        let mut working = guard.clone();
        let entries = work(&mut working)?;
        working.version = guard.version + 1;

        let mut logs = self
            .logs
            .lock()
            .map_err(|_| Self::contention(tenant_id, name))?;
        let mut last_hash = self
            .last_hash
            .lock()
            .map_err(|_| Self::contention(tenant_id, name))?;
        for mut entry in entries {
            entry.hash = chain_hash(&last_hash, &entry);
            *last_hash = entry.hash.clone();
            logs.push(entry);
        }

        *guard = working.clone();
        Ok(working)
    }
}

impl SerialNumberLogStore for InMemorySequenceStore {
    fn entries_for(&self, sequence_id: Uuid) -> SequenceResult<Vec<SerialNumberLog>> {
        let logs = self
            .logs
            .lock()
            .map_err(|_| SequenceError::storage("log store lock poisoned"))?;
        Ok(logs
            .iter()
            .filter(|e| e.sequence_id == sequence_id)
            .cloned()
            .collect())
    }

    fn entry_count(&self) -> SequenceResult<usize> {
        let logs = self
            .logs
            .lock()
            .map_err(|_| SequenceError::storage("log store lock poisoned"))?;
        Ok(logs.len())
    }

    fn verify_chain(&self) -> SequenceResult<bool> {
        let logs = self
            .logs
            .lock()
            .map_err(|_| SequenceError::storage("log store lock poisoned"))?;
        let mut prev = GENESIS_HASH.to_string();
        for entry in logs.iter() {
            if chain_hash(&prev, entry) != entry.hash {
                return Ok(false);
            }
            prev = entry.hash.clone();
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::GenerationContext;
    use chrono::Utc;

    fn store_with(seq: Sequence) -> InMemorySequenceStore {
        let store = InMemorySequenceStore::new();
        store.insert(seq).unwrap();
        store
    }

    #[test]
    fn test_find_missing_is_none() {
        let store = InMemorySequenceStore::new();
        assert!(store.find("acme", "po").unwrap().is_none());
    }

    #[test]
    fn test_insert_rejects_duplicate_key() {
        let store = store_with(Sequence::new("acme", "po", "{COUNTER}"));
        let err = store
            .insert(Sequence::new("acme", "po", "{COUNTER}"))
            .unwrap_err();
        assert!(matches!(err, SequenceError::Storage { .. }));
    }

    #[test]
    fn test_transact_commits_and_bumps_version() {
        let store = store_with(Sequence::new("acme", "po", "{COUNTER}"));
        let committed = store
            .transact("acme", "po", &mut |seq| {
                seq.current_value += seq.step_size;
                Ok(Vec::new())
            })
            .unwrap();
        assert_eq!(committed.current_value, 1);
        assert_eq!(committed.version, 1);
        assert_eq!(store.find("acme", "po").unwrap().unwrap().version, 1);
    }

    #[test]
    fn test_transact_rolls_back_on_error() {
        let store = store_with(Sequence::new("acme", "po", "{COUNTER}"));
        let seq_id = store.find("acme", "po").unwrap().unwrap().id;
        let err = store
            .transact("acme", "po", &mut |seq| {
                seq.current_value += seq.step_size;
                Err(SequenceError::unknown_variable("MYSTERY"))
            })
            .unwrap_err();
        assert!(matches!(err, SequenceError::UnknownVariable { .. }));

        let row = store.find("acme", "po").unwrap().unwrap();
        assert_eq!(row.current_value, 0, "increment must roll back");
        assert_eq!(row.version, 0);
        assert!(store.entries_for(seq_id).unwrap().is_empty());
    }

    #[test]
    fn test_lock_and_increment_returns_post_increment() {
        let store = store_with(Sequence::new("acme", "po", "{COUNTER}").with_step_size(10));
        assert_eq!(store.lock_and_increment("acme", "po").unwrap(), 10);
        assert_eq!(store.lock_and_increment("acme", "po").unwrap(), 20);
    }

    #[test]
    fn test_transact_missing_row() {
        let store = InMemorySequenceStore::new();
        let err = store
            .transact("acme", "po", &mut |_| Ok(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, SequenceError::SequenceNotFound { .. }));
    }

    #[test]
    fn test_log_chain_verifies_and_survives_delete() {
        let store = store_with(Sequence::new("acme", "po", "{COUNTER}"));
        let seq_id = store.find("acme", "po").unwrap().unwrap().id;
        for n in 1..=3u64 {
            store
                .transact("acme", "po", &mut |seq| {
                    seq.current_value += seq.step_size;
                    Ok(vec![SerialNumberLog::generated(
                        seq.id,
                        format!("PO-{:04}", n),
                        seq.current_value,
                        &GenerationContext::new(),
                        Utc::now(),
                    )])
                })
                .unwrap();
        }
        assert_eq!(store.entry_count().unwrap(), 3);
        assert!(store.verify_chain().unwrap());

        assert!(store.delete("acme", "po").unwrap());
        assert_eq!(
            store.entries_for(seq_id).unwrap().len(),
            3,
            "audit entries survive sequence deletion"
        );
    }
}
