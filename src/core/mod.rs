//! In-memory authoritative quiz store.

/// Dense, index-keyed quiz store.
pub mod store;
