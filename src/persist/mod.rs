/// SQLite journal implementation.
pub mod sqlite;

use std::fmt;

use crate::{core::store::StoreSnapshotV1, op::StoredOp, types::OpSeq};

/// Failures while writing or reading persisted quizzes.
#[derive(Debug)]
pub enum PersistError {
    /// Database failure.
    Sqlite(rusqlite::Error),
    /// Payload encoding or decoding failure.
    Serde(serde_json::Error),
    /// Anything else, already rendered.
    Message(String),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Sqlite(err) => write!(f, "storage error: {err}"),
            PersistError::Serde(err) => write!(f, "payload error: {err}"),
            PersistError::Message(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::Sqlite(err) => Some(err),
            PersistError::Serde(err) => Some(err),
            PersistError::Message(_) => None,
        }
    }
}

impl From<rusqlite::Error> for PersistError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

impl From<crate::core::store::StoreError> for PersistError {
    fn from(value: crate::core::store::StoreError) -> Self {
        Self::Message(format!("replay failed: {value}"))
    }
}

/// Result alias for persistence calls.
pub type PersistResult<T> = Result<T, PersistError>;

/// Destination for journaled store mutations.
pub trait OpSink: Send {
    /// Appends ops in order; returns the highest durable sequence.
    fn append_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq>;
    /// Forces buffered writes out.
    fn flush(&mut self) -> PersistResult<()> {
        Ok(())
    }
    /// Records a full snapshot covering everything up to `last_seq`.
    fn write_snapshot(&mut self, _snapshot: &StoreSnapshotV1, _last_seq: OpSeq) -> PersistResult<()> {
        Ok(())
    }
    /// Drops journal entries already covered by a snapshot.
    fn compact_through(&mut self, _seq: OpSeq) -> PersistResult<usize> {
        Ok(0)
    }
}
