use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{
    op::{Op, StoredOp},
    quiz::Quiz,
    types::{OpSeq, QuizKey},
};

/// Errors raised by [`QuizStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key does not resolve to a stored quiz.
    NotFound(QuizKey),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(key) => write!(f, "No quiz with id {key}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Serializable copy of the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshotV1 {
    /// Next sequence number to hand out.
    pub next_op_seq: OpSeq,
    /// Quizzes in key order.
    pub quizzes: Vec<Quiz>,
}

/// Ordered quiz collection keyed by dense position.
///
/// Keys are always `0..count()`. Deleting a quiz shifts every later quiz down
/// by one key.
#[derive(Debug, Default)]
pub struct QuizStore {
    quizzes: Vec<Quiz>,
    pending_ops: Vec<StoredOp>,
    next_op_seq: OpSeq,
}

impl QuizStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            next_op_seq: 1,
            ..Self::default()
        }
    }

    /// Creates a store holding the starter quizzes.
    ///
    /// The starter records are not journaled; they are part of the initial state.
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store.quizzes = default_quizzes();
        store
    }

    /// Rebuilds a store from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshotV1) -> Self {
        Self {
            quizzes: snapshot.quizzes,
            pending_ops: Vec::new(),
            next_op_seq: snapshot.next_op_seq.max(1),
        }
    }

    /// Copies the current state into a snapshot.
    pub fn export_snapshot(&self) -> StoreSnapshotV1 {
        StoreSnapshotV1 {
            next_op_seq: self.next_op_seq,
            quizzes: self.quizzes.clone(),
        }
    }

    /// Iterates all quizzes with their keys, in key order.
    pub fn get_all(&self) -> impl Iterator<Item = (QuizKey, &Quiz)> + '_ {
        self.quizzes.iter().enumerate()
    }

    /// Looks up the quiz at `key`.
    pub fn get_by_index(&self, key: QuizKey) -> Result<&Quiz, StoreError> {
        self.quizzes.get(key).ok_or(StoreError::NotFound(key))
    }

    /// Number of stored quizzes.
    pub fn count(&self) -> usize {
        self.quizzes.len()
    }

    /// Returns true when the store holds no quizzes.
    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }

    /// Appends a quiz and returns its key.
    pub fn add(&mut self, question: impl Into<String>, answer: impl Into<String>) -> (QuizKey, StoredOp) {
        let key = self.quizzes.len();
        let seq = self.take_next_op_seq();
        let stored = self.apply_add(key, Quiz::new(question, answer), seq);
        self.pending_ops.push(stored.clone());
        (key, stored)
    }

    /// Replaces question and answer of the quiz at `key`.
    pub fn update(
        &mut self,
        key: QuizKey,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<StoredOp, StoreError> {
        self.get_by_index(key)?;
        let seq = self.take_next_op_seq();
        let stored = self.apply_update(key, Quiz::new(question, answer), seq)?;
        self.pending_ops.push(stored.clone());
        Ok(stored)
    }

    /// Removes the quiz at `key` and renumbers the ones after it.
    pub fn delete_by_index(&mut self, key: QuizKey) -> Result<StoredOp, StoreError> {
        self.get_by_index(key)?;
        let seq = self.take_next_op_seq();
        let stored = self.apply_delete(key, seq)?;
        self.pending_ops.push(stored.clone());
        Ok(stored)
    }

    /// Re-applies a journaled op, keeping its sequence number.
    pub fn apply_replayed_op(&mut self, stored: StoredOp) -> Result<(), StoreError> {
        let seq = stored.seq;
        match stored.op {
            Op::Add { key, quiz } => {
                if key != self.quizzes.len() {
                    return Err(StoreError::NotFound(key));
                }
                self.apply_add(key, quiz, seq);
            }
            Op::Update { key, quiz, .. } => {
                self.apply_update(key, quiz, seq)?;
            }
            Op::Delete { key, .. } => {
                self.apply_delete(key, seq)?;
            }
        }
        Ok(())
    }

    /// Takes ops recorded since the last drain.
    ///
    /// Only callers that feed an [`crate::persist::OpSink`] directly need this.
    /// The runtime journals the `StoredOp` each mutation returns and drops
    /// this buffer after every mutation so it does not grow.
    pub fn drain_pending_ops(&mut self) -> Vec<StoredOp> {
        std::mem::take(&mut self.pending_ops)
    }

    /// Sequence number of the most recent op, 0 when none.
    pub fn latest_op_seq(&self) -> OpSeq {
        self.next_op_seq.saturating_sub(1)
    }

    fn apply_add(&mut self, key: QuizKey, quiz: Quiz, seq: OpSeq) -> StoredOp {
        self.quizzes.push(quiz.clone());
        self.bump_next_seq_from(seq);
        StoredOp {
            seq,
            ts_ms: now_ms(),
            op: Op::Add { key, quiz },
        }
    }

    fn apply_update(&mut self, key: QuizKey, quiz: Quiz, seq: OpSeq) -> Result<StoredOp, StoreError> {
        let slot = self.quizzes.get_mut(key).ok_or(StoreError::NotFound(key))?;
        let prev = std::mem::replace(slot, quiz.clone());
        self.bump_next_seq_from(seq);
        Ok(StoredOp {
            seq,
            ts_ms: now_ms(),
            op: Op::Update { key, quiz, prev },
        })
    }

    fn apply_delete(&mut self, key: QuizKey, seq: OpSeq) -> Result<StoredOp, StoreError> {
        if key >= self.quizzes.len() {
            return Err(StoreError::NotFound(key));
        }
        let prev = self.quizzes.remove(key);
        self.bump_next_seq_from(seq);
        Ok(StoredOp {
            seq,
            ts_ms: now_ms(),
            op: Op::Delete { key, prev },
        })
    }

    fn take_next_op_seq(&mut self) -> OpSeq {
        let seq = self.next_op_seq;
        self.next_op_seq += 1;
        seq
    }

    fn bump_next_seq_from(&mut self, seq: OpSeq) {
        self.next_op_seq = self.next_op_seq.max(seq.saturating_add(1));
    }
}

fn default_quizzes() -> Vec<Quiz> {
    vec![
        Quiz::new("Capital of Italy", "Rome"),
        Quiz::new("Capital of France", "Paris"),
        Quiz::new("Capital of Spain", "Madrid"),
        Quiz::new("Capital of Portugal", "Lisbon"),
    ]
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
