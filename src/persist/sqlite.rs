//! SQLite-backed append-only journal of quiz mutations.
//!
//! `events` holds one row per [`StoredOp`]; the kind and quiz key are copied
//! into their own columns next to the JSON payload. `snapshots` holds whole
//! quiz lists, and a store is rebuilt from the newest one plus later events.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, types::Type};
use serde::{Deserialize, Serialize};

use crate::{
    core::store::{QuizStore, StoreSnapshotV1},
    op::{OP_FORMAT_VERSION, StoredOp, StoredOpEnvelope},
    types::OpSeq,
};

use super::{OpSink, PersistError, PersistResult};

const SNAPSHOT_FORMAT_VERSION: u16 = 1;

const SELECT_JOURNAL_AFTER: &str =
    "SELECT seq, ts_ms, kind, quiz_key, payload FROM events WHERE seq > ?1 ORDER BY seq";
const INSERT_JOURNAL: &str = "INSERT INTO events(seq, ts_ms, kind, quiz_key, payload) VALUES (?1, ?2, ?3, ?4, ?5)";
const SELECT_NEWEST_SNAPSHOT: &str = "SELECT payload FROM snapshots ORDER BY id DESC LIMIT 1";

#[derive(Serialize, Deserialize)]
struct SnapshotEnvelope<S> {
    format_version: u16,
    snapshot: S,
}

/// SQLite implementation of [`crate::persist::OpSink`].
pub struct SqliteOpSink {
    conn: Connection,
}

impl SqliteOpSink {
    /// Opens or creates a database at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        Self::prepare(Connection::open(path)?)
    }

    /// Opens an in-memory database.
    pub fn open_in_memory() -> PersistResult<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// True when neither a snapshot nor any event has been written.
    pub fn is_empty(&self) -> PersistResult<bool> {
        let empty = self.conn.query_row(
            "SELECT NOT EXISTS(SELECT 1 FROM events) AND NOT EXISTS(SELECT 1 FROM snapshots)",
            [],
            |row| row.get(0),
        )?;
        Ok(empty)
    }

    /// Loads store state from the latest snapshot plus newer events.
    pub fn load_store(&self) -> PersistResult<QuizStore> {
        let mut store = self
            .load_latest_snapshot()?
            .map(QuizStore::from_snapshot)
            .unwrap_or_else(QuizStore::new);

        let tail = self.load_events_after(store.latest_op_seq())?;
        debug!("replaying {} journaled ops onto {} quizzes", tail.len(), store.count());
        for stored in tail {
            store.apply_replayed_op(stored)?;
        }
        Ok(store)
    }

    /// Loads the store, or on a fresh database seeds the starter quizzes.
    ///
    /// The seeded state is written as the first snapshot so later journal
    /// entries replay on top of it.
    pub fn load_or_seed(&mut self, seed: bool) -> PersistResult<QuizStore> {
        if !seed || !self.is_empty()? {
            return self.load_store();
        }
        let store = QuizStore::with_defaults();
        self.write_snapshot(&store.export_snapshot(), store.latest_op_seq())?;
        info!("seeded {} starter quizzes", store.count());
        Ok(store)
    }

    /// Loads journaled ops strictly after `seq`, oldest first.
    pub fn load_events_after(&self, seq: OpSeq) -> PersistResult<Vec<StoredOp>> {
        let mut stmt = self.conn.prepare_cached(SELECT_JOURNAL_AFTER)?;
        let ops = stmt
            .query_map([seq as i64], journal_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ops)
    }

    /// Writes a snapshot covering `last_seq`.
    pub fn write_snapshot(&mut self, snapshot: &StoreSnapshotV1, last_seq: OpSeq) -> PersistResult<()> {
        let payload = serde_json::to_vec(&SnapshotEnvelope {
            format_version: SNAPSHOT_FORMAT_VERSION,
            snapshot,
        })?;
        self.conn.execute(
            "INSERT INTO snapshots(last_seq, ts_ms, payload) VALUES (?1, ?2, ?3)",
            params![last_seq as i64, now_ms() as i64, payload],
        )?;
        debug!("snapshot of {} quizzes written through seq {last_seq}", snapshot.quizzes.len());
        Ok(())
    }

    /// Deletes events up to and including `seq`.
    pub fn compact_through(&mut self, seq: OpSeq) -> PersistResult<usize> {
        Ok(self.conn.execute("DELETE FROM events WHERE seq <= ?1", [seq as i64])?)
    }

    /// Returns the latest sequence persisted in the events table.
    pub fn latest_seq(&self) -> PersistResult<OpSeq> {
        let seq: i64 = self
            .conn
            .query_row("SELECT COALESCE(MAX(seq), 0) FROM events", [], |row| row.get(0))?;
        Ok(seq as OpSeq)
    }

    fn load_latest_snapshot(&self) -> PersistResult<Option<StoreSnapshotV1>> {
        self.conn
            .query_row(SELECT_NEWEST_SNAPSHOT, [], |row| row.get::<_, Vec<u8>>(0))
            .optional()?
            .map(|payload| decode_snapshot(&payload))
            .transpose()
    }
}

impl OpSink for SqliteOpSink {
    fn append_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq> {
        let Some(last) = ops.last() else {
            return self.latest_seq();
        };

        let tx = self.conn.transaction()?;
        for stored in ops {
            insert_journal_row(&tx, stored)?;
        }
        tx.commit()?;
        Ok(last.seq)
    }

    fn flush(&mut self) -> PersistResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }

    fn write_snapshot(&mut self, snapshot: &StoreSnapshotV1, last_seq: OpSeq) -> PersistResult<()> {
        SqliteOpSink::write_snapshot(self, snapshot, last_seq)
    }

    fn compact_through(&mut self, seq: OpSeq) -> PersistResult<usize> {
        SqliteOpSink::compact_through(self, seq)
    }
}

fn insert_journal_row(tx: &Transaction<'_>, stored: &StoredOp) -> PersistResult<()> {
    let payload = serde_json::to_vec(&StoredOpEnvelope::new(stored.clone()))?;
    tx.prepare_cached(INSERT_JOURNAL)?.execute(params![
        stored.seq as i64,
        stored.ts_ms as i64,
        stored.op.kind(),
        stored.op.key() as i64,
        payload,
    ])?;
    Ok(())
}

/// Decodes one `events` row; the indexed kind and key must agree with the payload.
fn journal_row(row: &Row<'_>) -> rusqlite::Result<StoredOp> {
    let seq: i64 = row.get("seq")?;
    let kind: i64 = row.get("kind")?;
    let quiz_key: i64 = row.get("quiz_key")?;
    let payload: Vec<u8> = row.get("payload")?;

    let envelope: StoredOpEnvelope = serde_json::from_slice(&payload)
        .map_err(|err| bad_payload(4, format!("op payload decode failed: {err}")))?;
    if envelope.format_version != OP_FORMAT_VERSION {
        return Err(bad_payload(
            4,
            format!("unsupported op format version: {}", envelope.format_version),
        ));
    }

    let mut stored = envelope.stored;
    if stored.op.kind() != kind || stored.op.key() as i64 != quiz_key {
        return Err(bad_payload(
            4,
            format!("journal row {seq} does not match its payload"),
        ));
    }
    stored.seq = seq as OpSeq;
    stored.ts_ms = row.get::<_, i64>("ts_ms")? as u64;
    Ok(stored)
}

fn bad_payload(column: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Blob, Box::new(std::io::Error::other(msg)))
}

fn decode_snapshot(payload: &[u8]) -> PersistResult<StoreSnapshotV1> {
    let envelope: SnapshotEnvelope<StoreSnapshotV1> = serde_json::from_slice(payload)?;
    if envelope.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(PersistError::Message(format!(
            "unsupported snapshot format version: {}",
            envelope.format_version
        )));
    }
    Ok(envelope.snapshot)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
