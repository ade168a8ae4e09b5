//! Runtime and application configuration.

use std::{env, path::PathBuf, str::FromStr};

use log::warn;

/// Knobs for the store runtime and its persistence worker.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Write each op to the sink as soon as it arrives.
    pub flush_on_write: bool,
    /// Flush once this many ops are buffered.
    pub batch_max_ops: usize,
    /// Flush a non-empty buffer after this many milliseconds.
    pub batch_max_latency_ms: u64,
    /// Capacity of the queue between runtime and persistence worker.
    pub persist_queue_bound: usize,
    /// Write a snapshot every N applied mutations; 0 disables.
    pub snapshot_every_ops: usize,
    /// Drop journal entries covered by a fresh snapshot.
    pub compact_after_snapshot: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            flush_on_write: true,
            batch_max_ops: 32,
            batch_max_latency_ms: 75,
            persist_queue_bound: 64,
            snapshot_every_ops: 200,
            compact_after_snapshot: true,
        }
    }
}

/// Settings for the interactive binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database holding the quizzes.
    pub db_path: PathBuf,
    /// Emit ANSI colour codes.
    pub color: bool,
    /// Seed the starter quizzes into an empty database.
    pub seed_defaults: bool,
    /// Runtime settings.
    pub runtime: RuntimeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("quizzes.db"),
            color: true,
            seed_defaults: true,
            runtime: RuntimeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads settings from `QUIZDECK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`AppConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("QUIZDECK_DB").filter(|p| !p.is_empty()) {
            config.db_path = PathBuf::from(path);
        }
        if lookup("QUIZDECK_NO_COLOR").is_some() || lookup("NO_COLOR").is_some() {
            config.color = false;
        }
        if lookup("QUIZDECK_NO_SEED").is_some() {
            config.seed_defaults = false;
        }
        if let Some(every) = parse_var(&lookup, "QUIZDECK_SNAPSHOT_EVERY") {
            config.runtime.snapshot_every_ops = every;
        }
        config
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring {name}={raw:?}: not a valid number");
            None
        }
    }
}
