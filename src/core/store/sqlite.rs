// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite storage backend.
//!
//! Counter mutations run inside `BEGIN IMMEDIATE` transactions, so the
//! read-compute-write of `transact` holds the database write lock for
//! its whole extent and concurrent writers across processes serialize at
//! the storage layer. Busy/locked failures surface as retryable
//! `LockContention`; the engine never retries internally.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use super::{chain_hash, SequenceMutation, SequenceStore, SerialNumberLogStore, GENESIS_HASH};
use crate::core::error::{SequenceError, SequenceResult};
use crate::core::model::{LogAction, ResetPeriod, Sequence, SerialNumberLog};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sequences (
    id            TEXT PRIMARY KEY,
    tenant_id     TEXT NOT NULL,
    name          TEXT NOT NULL,
    pattern       TEXT NOT NULL,
    reset_period  TEXT NOT NULL,
    reset_limit   INTEGER,
    padding       INTEGER NOT NULL,
    step_size     INTEGER NOT NULL,
    current_value INTEGER NOT NULL,
    last_reset_at TEXT,
    version       INTEGER NOT NULL,
    metadata      TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (tenant_id, name)
);
CREATE TABLE IF NOT EXISTS serial_number_log (
    id               TEXT PRIMARY KEY,
    sequence_id      TEXT NOT NULL,
    generated_number TEXT NOT NULL,
    counter_value    INTEGER NOT NULL,
    context          TEXT NOT NULL,
    action           TEXT NOT NULL,
    reason           TEXT,
    causer_id        TEXT,
    created_at       TEXT NOT NULL,
    hash             TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_serial_number_log_sequence
    ON serial_number_log (sequence_id);
";

const SEQUENCE_COLUMNS: &str = "id, tenant_id, name, pattern, reset_period, reset_limit, \
     padding, step_size, current_value, last_reset_at, version, metadata, created_at, updated_at";

pub struct SqliteSequenceStore {
    conn: Mutex<Connection>,
}

impl SqliteSequenceStore {
    pub fn open<P: AsRef<Path>>(path: P) -> SequenceResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> SequenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> SequenceResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn contention(tenant_id: &str, name: &str) -> SequenceError {
        SequenceError::LockContention {
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
        }
    }

    fn map_sqlite(e: rusqlite::Error, tenant_id: &str, name: &str) -> SequenceError {
        if let rusqlite::Error::SqliteFailure(ref failure, _) = e {
            if matches!(
                failure.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) {
                return Self::contention(tenant_id, name);
            }
        }
        e.into()
    }

    fn query_sequence(
        conn: &Connection,
        tenant_id: &str,
        name: &str,
    ) -> SequenceResult<Option<Sequence>> {
        let sql = format!(
            "SELECT {} FROM sequences WHERE tenant_id = ?1 AND name = ?2",
            SEQUENCE_COLUMNS
        );
        let raw = conn
            .query_row(&sql, params![tenant_id, name], RawSequenceRow::from_row)
            .optional()?;
        raw.map(RawSequenceRow::into_sequence).transpose()
    }

    fn update_sequence(conn: &Connection, seq: &Sequence) -> SequenceResult<()> {
        conn.execute(
            "UPDATE sequences SET pattern = ?1, reset_period = ?2, reset_limit = ?3, \
             padding = ?4, step_size = ?5, current_value = ?6, last_reset_at = ?7, \
             version = ?8, metadata = ?9, updated_at = ?10 WHERE id = ?11",
            params![
                seq.pattern,
                seq.reset_period.as_str(),
                seq.reset_limit.map(|v| v as i64),
                seq.padding as i64,
                seq.step_size as i64,
                seq.current_value as i64,
                seq.last_reset_at.map(|t| t.to_rfc3339()),
                seq.version as i64,
                serde_json::Value::Object(seq.metadata.clone()).to_string(),
                seq.updated_at.to_rfc3339(),
                seq.id.to_string(),
            ],
        )?;
        Ok(())
    }

    fn insert_log(conn: &Connection, entry: &SerialNumberLog) -> SequenceResult<()> {
        conn.execute(
            "INSERT INTO serial_number_log (id, sequence_id, generated_number, counter_value, \
             context, action, reason, causer_id, created_at, hash) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.id.to_string(),
                entry.sequence_id.to_string(),
                entry.generated_number,
                entry.counter_value as i64,
                entry.context.to_string(),
                entry.action.as_str(),
                entry.reason,
                entry.causer_id,
                entry.created_at.to_rfc3339(),
                entry.hash,
            ],
        )?;
        Ok(())
    }

    fn last_hash(conn: &Connection) -> SequenceResult<String> {
        let hash = conn
            .query_row(
                "SELECT hash FROM serial_number_log ORDER BY rowid DESC LIMIT 1",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(hash.unwrap_or_else(|| GENESIS_HASH.to_string()))
    }
}

impl SequenceStore for SqliteSequenceStore {
    fn find(&self, tenant_id: &str, name: &str) -> SequenceResult<Option<Sequence>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Self::contention(tenant_id, name))?;
        Self::query_sequence(&conn, tenant_id, name)
    }

    fn insert(&self, seq: Sequence) -> SequenceResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Self::contention(&seq.tenant_id, &seq.name))?;
        let sql = format!(
            "INSERT INTO sequences ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            SEQUENCE_COLUMNS
        );
        conn.execute(
            &sql,
            params![
                seq.id.to_string(),
                seq.tenant_id,
                seq.name,
                seq.pattern,
                seq.reset_period.as_str(),
                seq.reset_limit.map(|v| v as i64),
                seq.padding as i64,
                seq.step_size as i64,
                seq.current_value as i64,
                seq.last_reset_at.map(|t| t.to_rfc3339()),
                seq.version as i64,
                serde_json::Value::Object(seq.metadata.clone()).to_string(),
                seq.created_at.to_rfc3339(),
                seq.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                SequenceError::storage(format!(
                    "sequence '{}' already exists for tenant '{}'",
                    seq.name, seq.tenant_id
                ))
            }
            other => other.into(),
        })?;
        Ok(())
    }

    fn delete(&self, tenant_id: &str, name: &str) -> SequenceResult<bool> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Self::contention(tenant_id, name))?;
        let changed = conn.execute(
            "DELETE FROM sequences WHERE tenant_id = ?1 AND name = ?2",
            params![tenant_id, name],
        )?;
        Ok(changed > 0)
    }

    fn transact(
        &self,
        tenant_id: &str,
        name: &str,
        work: &mut SequenceMutation<'_>,
    ) -> SequenceResult<Sequence> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| Self::contention(tenant_id, name))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Self::map_sqlite(e, tenant_id, name))?;

        let mut seq = Self::query_sequence(&tx, tenant_id, name)?
            .ok_or_else(|| SequenceError::sequence_not_found(tenant_id, name))?;
        let prior_version = seq.version;

        // an Err here drops the transaction and rolls everything back
        let entries = work(&mut seq)?;
        seq.version = prior_version + 1;
        Self::update_sequence(&tx, &seq)?;

        let mut last = Self::last_hash(&tx)?;
        for mut entry in entries {
            entry.hash = chain_hash(&last, &entry);
            last = entry.hash.clone();
            Self::insert_log(&tx, &entry)?;
        }

        tx.commit()
            .map_err(|e| Self::map_sqlite(e, tenant_id, name))?;
        Ok(seq)
    }
}

impl SerialNumberLogStore for SqliteSequenceStore {
    fn entries_for(&self, sequence_id: Uuid) -> SequenceResult<Vec<SerialNumberLog>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| SequenceError::storage("sqlite connection lock poisoned"))?;
        let mut stmt = conn.prepare(
            "SELECT id, sequence_id, generated_number, counter_value, context, action, \
             reason, causer_id, created_at, hash FROM serial_number_log \
             WHERE sequence_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![sequence_id.to_string()], RawLogRow::from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_log()?);
        }
        Ok(entries)
    }

    fn entry_count(&self) -> SequenceResult<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| SequenceError::storage("sqlite connection lock poisoned"))?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM serial_number_log", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn verify_chain(&self) -> SequenceResult<bool> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| SequenceError::storage("sqlite connection lock poisoned"))?;
        let mut stmt = conn.prepare(
            "SELECT id, sequence_id, generated_number, counter_value, context, action, \
             reason, causer_id, created_at, hash FROM serial_number_log ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], RawLogRow::from_row)?;
        let mut prev = GENESIS_HASH.to_string();
        for row in rows {
            let entry = row?.into_log()?;
            if chain_hash(&prev, &entry) != entry.hash {
                return Ok(false);
            }
            prev = entry.hash.clone();
        }
        Ok(true)
    }
}

struct RawSequenceRow {
    id: String,
    tenant_id: String,
    name: String,
    pattern: String,
    reset_period: String,
    reset_limit: Option<i64>,
    padding: i64,
    step_size: i64,
    current_value: i64,
    last_reset_at: Option<String>,
    version: i64,
    metadata: String,
    created_at: String,
    updated_at: String,
}

impl RawSequenceRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            name: row.get(2)?,
            pattern: row.get(3)?,
            reset_period: row.get(4)?,
            reset_limit: row.get(5)?,
            padding: row.get(6)?,
            step_size: row.get(7)?,
            current_value: row.get(8)?,
            last_reset_at: row.get(9)?,
            version: row.get(10)?,
            metadata: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    fn into_sequence(self) -> SequenceResult<Sequence> {
        let metadata = match serde_json::from_str(&self.metadata) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        Ok(Sequence {
            id: parse_uuid(&self.id)?,
            tenant_id: self.tenant_id,
            name: self.name,
            pattern: self.pattern,
            reset_period: ResetPeriod::parse(&self.reset_period)
                .map_err(SequenceError::storage)?,
            reset_limit: self.reset_limit.map(|v| v as u64),
            padding: self.padding as usize,
            step_size: self.step_size as u64,
            current_value: self.current_value as u64,
            last_reset_at: self.last_reset_at.as_deref().map(parse_ts).transpose()?,
            version: self.version as u64,
            metadata,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

struct RawLogRow {
    id: String,
    sequence_id: String,
    generated_number: String,
    counter_value: i64,
    context: String,
    action: String,
    reason: Option<String>,
    causer_id: Option<String>,
    created_at: String,
    hash: String,
}

impl RawLogRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sequence_id: row.get(1)?,
            generated_number: row.get(2)?,
            counter_value: row.get(3)?,
            context: row.get(4)?,
            action: row.get(5)?,
            reason: row.get(6)?,
            causer_id: row.get(7)?,
            created_at: row.get(8)?,
            hash: row.get(9)?,
        })
    }

    fn into_log(self) -> SequenceResult<SerialNumberLog> {
        Ok(SerialNumberLog {
            id: parse_uuid(&self.id)?,
            sequence_id: parse_uuid(&self.sequence_id)?,
            generated_number: self.generated_number,
            counter_value: self.counter_value as u64,
            context: serde_json::from_str(&self.context)
                .unwrap_or(serde_json::Value::Null),
            action: LogAction::parse(&self.action).map_err(SequenceError::storage)?,
            reason: self.reason,
            causer_id: self.causer_id,
            created_at: parse_ts(&self.created_at)?,
            hash: self.hash,
        })
    }
}

fn parse_uuid(s: &str) -> SequenceResult<Uuid> {
    Uuid::parse_str(s)
        .map_err(|e| SequenceError::storage(format!("invalid uuid '{}': {}", s, e)))
}

fn parse_ts(s: &str) -> SequenceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SequenceError::storage(format!("invalid timestamp '{}': {}", s, e)))
}
