//! Interactive quiz trainer: a dense, index-keyed quiz store with an
//! append-only SQLite journal, and random play-through sessions that end at
//! the first wrong answer.
//!
//! # Examples
//!
//! In-memory store usage with [`core::store::QuizStore`]:
//! ```
//! use quizdeck::core::store::{QuizStore, StoreError};
//!
//! let mut store = QuizStore::new();
//! let (key, _op) = store.add("2+2", "4");
//! assert_eq!(key, 0);
//! assert!(store.get_by_index(0).expect("quiz").accepts("4"));
//! assert_eq!(store.get_by_index(1), Err(StoreError::NotFound(1)));
//! ```
//!
//! Driving a play session with a scripted player:
//! ```
//! use quizdeck::{
//!     quiz::Quiz,
//!     session::{play, GameResult, Interaction, PlaySession},
//! };
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! struct AlwaysFour;
//!
//! impl Interaction for AlwaysFour {
//!     async fn ask(&mut self, _question: &str) -> Option<String> {
//!         Some("4".to_string())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut session = PlaySession::new(vec![Quiz::new("2+2", "4"), Quiz::new("1+3", "4")]);
//! let mut rng = StdRng::seed_from_u64(1);
//! let outcome = play(&mut session, &mut rng, &mut AlwaysFour).await.expect("finished");
//! assert_eq!(outcome.result, GameResult::Won);
//! assert_eq!(outcome.score, 2);
//! # }
//! ```
#![warn(missing_docs)]

/// Interactive command-line front end.
pub mod cli;
/// Runtime and application configuration.
pub mod config;
/// Core in-memory quiz store.
pub mod core;
/// Mutation op model and persistence wrapper types.
pub mod op;
/// Persistence abstraction and SQLite implementation.
pub mod persist;
/// Quiz record and answer comparison.
pub mod quiz;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Play sessions and single-quiz tests.
pub mod session;
/// Shared primitive aliases.
pub mod types;
