//! Mutation operation model and persistence wrappers.

use serde::{Deserialize, Serialize};

use crate::{
    quiz::Quiz,
    types::{OpSeq, QuizKey},
};

/// Version number for serialized [`StoredOpEnvelope`] payloads.
pub const OP_FORMAT_VERSION: u16 = 1;

/// Immutable operation appended to the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Append a quiz at key `key` (always the count before the add).
    Add {
        /// Key assigned to the new quiz.
        key: QuizKey,
        /// Added quiz.
        quiz: Quiz,
    },
    /// Replace both fields of the quiz at `key`.
    Update {
        /// Key of the replaced quiz.
        key: QuizKey,
        /// New contents.
        quiz: Quiz,
        /// Contents before the update.
        prev: Quiz,
    },
    /// Remove the quiz at `key`, shifting later keys down by one.
    Delete {
        /// Key of the removed quiz.
        key: QuizKey,
        /// Removed contents.
        prev: Quiz,
    },
}

impl Op {
    /// Key the operation targets.
    pub fn key(&self) -> QuizKey {
        match self {
            Op::Add { key, .. } | Op::Update { key, .. } | Op::Delete { key, .. } => *key,
        }
    }

    /// Small integer tag stored alongside the payload.
    pub fn kind(&self) -> i64 {
        match self {
            Op::Add { .. } => 1,
            Op::Update { .. } => 2,
            Op::Delete { .. } => 3,
        }
    }
}

/// Journal row metadata plus operation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOp {
    /// Monotonic operation sequence.
    pub seq: OpSeq,
    /// Operation timestamp in milliseconds.
    pub ts_ms: u64,
    /// Operation body.
    pub op: Op,
}

/// Versioned wrapper for stable on-disk payload decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOpEnvelope {
    /// Payload format version.
    pub format_version: u16,
    /// Wrapped operation.
    pub stored: StoredOp,
}

impl StoredOpEnvelope {
    /// Constructs an envelope using [`OP_FORMAT_VERSION`].
    pub fn new(stored: StoredOp) -> Self {
        Self {
            format_version: OP_FORMAT_VERSION,
            stored,
        }
    }
}
