//! Error types for dirtally-core.
//!
//! Listing failures are deliberately absent here: an unreadable directory
//! is recorded in the report as a skipped subtree, never returned to the
//! caller. Only setup problems (bad configuration, worker threads that
//! cannot start) surface as errors.

use thiserror::Error;

/// Top-level error returned by [`crate::scan`].
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Rejected [`crate::ScanConfig`] values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("worker count {requested} exceeds the maximum of {max}")]
    TooManyWorkers { requested: usize, max: usize },

    #[error("bounded queue capacity must be at least 1 (use an unbounded queue instead)")]
    ZeroQueueCapacity,
}

/// Task pool failures.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("failed to spawn worker {id}: {source}")]
    Spawn {
        id: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {id} panicked outside a job")]
    WorkerPanicked { id: usize },
}
