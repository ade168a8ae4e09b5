//! Shared primitive aliases.

/// Dense, zero-based position of a quiz in the store.
pub type QuizKey = usize;
/// Monotonic operation sequence number.
pub type OpSeq = u64;
/// Number of correct answers in a play session.
pub type Score = u32;
