//! Scan configuration.
//!
//! [`ScanConfig`] is a plain value built with `with_*` setters and checked
//! once by [`ScanConfig::validate`] before any thread is started.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Upper bound on worker threads; anything beyond this is almost
/// certainly a typo and would only thrash the directory cache.
pub const MAX_WORKERS: usize = 1024;

/// Default job queue capacity for [`QueueBound::Bounded`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 4_096;

/// Default number of largest files kept in the report.
pub const DEFAULT_TOP_K: usize = 10;

/// Capacity of the task pool's job queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueBound {
    /// Never blocks a submitter. Memory grows with tree width.
    Unbounded,
    /// At most `n` queued jobs. External submitters block when full;
    /// pool workers run the job inline instead. Inline walks nest on the
    /// worker's stack (one frame group per tree level that overflowed), so
    /// a tiny `n` on a very deep tree leans on
    /// [`WORKER_STACK_SIZE`](crate::pool::WORKER_STACK_SIZE).
    Bounded(usize),
}

/// How a finished directory's totals reach its ancestors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Propagation {
    /// Every directory adds its local delta to itself and to each ancestor
    /// in turn, locking one node at a time. O(depth) per directory.
    AncestorChain,
    /// A directory reports its full subtree total to its parent exactly
    /// once, when it and all of its descendants are finished.
    Reduce,
}

/// Parameters for one scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub workers: usize,
    pub queue: QueueBound,
    pub top_k: usize,
    pub follow_links: bool,
    pub propagation: Propagation,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            queue: QueueBound::Bounded(DEFAULT_QUEUE_CAPACITY),
            top_k: DEFAULT_TOP_K,
            follow_links: false,
            propagation: Propagation::Reduce,
        }
    }
}

impl ScanConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue(mut self, queue: QueueBound) -> Self {
        self.queue = queue;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    /// Check the configuration before starting any threads.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.workers > MAX_WORKERS {
            return Err(ConfigError::TooManyWorkers {
                requested: self.workers,
                max: MAX_WORKERS,
            });
        }
        if self.queue == QueueBound::Bounded(0) {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }
}
