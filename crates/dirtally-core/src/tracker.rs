//! Completion tracking for dynamically spawned work.
//!
//! Every unit of work is counted *before* it is handed to the pool, so the
//! count can only reach zero once nothing is running and nothing is about
//! to be scheduled. [`WorkToken`] ties one count to a value whose drop
//! retires it, which keeps the count honest when a job panics or is
//! dropped without running.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Counter of outstanding work with a blocking wait for zero.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    outstanding: Mutex<usize>,
    idle: Condvar,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `n` units of work that have not been submitted yet.
    pub fn add(&self, n: usize) {
        *self.outstanding.lock() += n;
    }

    /// Retire one unit. Wakes every waiter when the count reaches zero.
    pub fn done(&self) {
        let mut outstanding = self.outstanding.lock();
        debug_assert!(*outstanding > 0, "CompletionTracker::done without add");
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.idle.notify_all();
        }
    }

    /// Block until the count is zero. Returns immediately if it already is.
    pub fn wait(&self) {
        let mut outstanding = self.outstanding.lock();
        while *outstanding > 0 {
            self.idle.wait(&mut outstanding);
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    /// Returns `true` if the count reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut outstanding = self.outstanding.lock();
        while *outstanding > 0 {
            if self.idle.wait_until(&mut outstanding, deadline).timed_out() {
                return *outstanding == 0;
            }
        }
        true
    }

    pub fn outstanding(&self) -> usize {
        *self.outstanding.lock()
    }

    /// Count one unit now and return the token that retires it on drop.
    pub fn token(self: &Arc<Self>) -> WorkToken {
        self.add(1);
        WorkToken {
            tracker: Arc::clone(self),
        }
    }
}

/// One counted unit of work. Dropping it calls [`CompletionTracker::done`].
#[derive(Debug)]
#[must_use = "dropping a WorkToken immediately marks its work as done"]
pub struct WorkToken {
    tracker: Arc<CompletionTracker>,
}

impl Drop for WorkToken {
    fn drop(&mut self) {
        self.tracker.done();
    }
}
