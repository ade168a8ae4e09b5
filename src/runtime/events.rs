//! Runtime event stream payloads.

use crate::types::{OpSeq, QuizKey};

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizEvent {
    /// A quiz was appended.
    Added {
        /// Key of the new quiz.
        key: QuizKey,
    },
    /// A quiz was replaced in place.
    Updated {
        /// Key of the updated quiz.
        key: QuizKey,
    },
    /// A quiz was removed; later keys moved down by one.
    Deleted {
        /// Key the removed quiz had.
        key: QuizKey,
    },
    /// Persistence has reached at least this op sequence.
    DurableUpTo {
        /// Highest sequence known durable.
        op_seq: OpSeq,
    },
}
