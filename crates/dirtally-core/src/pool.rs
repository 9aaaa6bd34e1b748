//! Fixed-size worker pool with a bounded job queue.
//!
//! Jobs travel over a crossbeam channel to `workers` named threads. With a
//! bounded queue, a full channel applies backpressure in two ways:
//!
//! - a thread outside the pool blocks in [`PoolHandle::execute`] until a
//!   slot frees up;
//! - a pool worker never blocks on its own queue (every worker could end up
//!   waiting on every other one). It runs the job inline instead.
//!
//! A job submitted after [`TaskPool::stop`] also runs inline, so work is
//! never silently lost.

use crate::config::QueueBound;
use crate::error::PoolError;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace};

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Terminate,
}

/// Worker stack size. A worker that finds its queue full walks the child
/// directory on its own stack, so nesting depth grows with tree depth.
pub const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Id of the pool that owns the current thread, if any.
    static WORKER_OF: Cell<Option<u64>> = const { Cell::new(None) };
}

/// How a job was dispatched by [`PoolHandle::execute`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Queued,
    /// Ran to completion on the submitting thread before `execute` returned.
    Inline,
}

/// Counters shared by the pool and all of its handles.
#[derive(Debug, Default)]
pub struct PoolStats {
    pub queued: AtomicU64,
    pub inline: AtomicU64,
    pub panicked: AtomicU64,
}

impl PoolStats {
    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn inline(&self) -> u64 {
        self.inline.load(Ordering::Relaxed)
    }

    pub fn panicked(&self) -> u64 {
        self.panicked.load(Ordering::Relaxed)
    }
}

/// Cloneable submission side of a [`TaskPool`].
#[derive(Clone)]
pub struct PoolHandle {
    sender: Sender<Message>,
    pool_id: u64,
    stats: Arc<PoolStats>,
}

impl PoolHandle {
    /// Submit a job. See the module docs for the overflow policy.
    pub fn execute<F>(&self, job: F) -> Dispatch
    where
        F: FnOnce() + Send + 'static,
    {
        let message = Message::Run(Box::new(job));
        let on_own_worker = WORKER_OF.with(|w| w.get() == Some(self.pool_id));

        let rejected = if on_own_worker {
            match self.sender.try_send(message) {
                Ok(()) => None,
                Err(TrySendError::Full(m)) | Err(TrySendError::Disconnected(m)) => Some(m),
            }
        } else {
            self.sender.send(message).err().map(|e| e.into_inner())
        };

        match rejected {
            None => {
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
                Dispatch::Queued
            }
            Some(message) => {
                self.stats.inline.fetch_add(1, Ordering::Relaxed);
                trace!(pool = self.pool_id, "queue unavailable, running job inline");
                if let Message::Run(job) = message {
                    run_job(job, &self.stats);
                }
                Dispatch::Inline
            }
        }
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }
}

struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

/// A fixed set of worker threads consuming one shared job queue.
pub struct TaskPool {
    workers: Vec<Worker>,
    handle: PoolHandle,
    stopped: bool,
}

impl TaskPool {
    /// Start `workers` threads. `workers` must be at least 1.
    pub fn new(workers: usize, queue: QueueBound) -> Result<Self, PoolError> {
        let (sender, receiver) = match queue {
            QueueBound::Unbounded => crossbeam_channel::unbounded(),
            QueueBound::Bounded(capacity) => crossbeam_channel::bounded(capacity.max(1)),
        };
        let pool_id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let stats = Arc::new(PoolStats::default());

        let mut pool = Self {
            workers: Vec::with_capacity(workers),
            handle: PoolHandle {
                sender,
                pool_id,
                stats: Arc::clone(&stats),
            },
            stopped: false,
        };

        for id in 0..workers.max(1) {
            let rx = receiver.clone();
            let stats = Arc::clone(&stats);
            // On failure `pool` is dropped, which stops the workers already running.
            let handle = thread::Builder::new()
                .name(format!("dirtally-worker-{id}"))
                .stack_size(WORKER_STACK_SIZE)
                .spawn(move || worker_loop(id, pool_id, rx, stats))
                .map_err(|source| PoolError::Spawn { id, source })?;
            pool.workers.push(Worker {
                id,
                handle: Some(handle),
            });
        }

        debug!(pool = pool_id, workers = pool.workers.len(), ?queue, "Task pool started");
        Ok(pool)
    }

    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn stats(&self) -> &PoolStats {
        &self.handle.stats
    }

    /// Let queued and running jobs finish, then join every worker.
    ///
    /// Termination messages queue up behind pending jobs, so everything
    /// submitted before `stop` still runs. Idempotent.
    pub fn stop(&mut self) -> Result<(), PoolError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        for _ in &self.workers {
            // Only fails if every worker is already gone.
            let _ = self.handle.sender.send(Message::Terminate);
        }

        let mut result = Ok(());
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    error!(worker = worker.id, "Worker thread panicked");
                    result = Err(PoolError::WorkerPanicked { id: worker.id });
                }
            }
        }
        debug!(
            pool = self.handle.pool_id,
            queued = self.stats().queued(),
            inline = self.stats().inline(),
            "Task pool stopped"
        );
        result
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn worker_loop(id: usize, pool_id: u64, receiver: Receiver<Message>, stats: Arc<PoolStats>) {
    WORKER_OF.with(|w| w.set(Some(pool_id)));
    trace!(worker = id, "Worker starting");
    while let Ok(message) = receiver.recv() {
        match message {
            Message::Run(job) => run_job(job, &stats),
            Message::Terminate => break,
        }
    }
    trace!(worker = id, "Worker exiting");
}

/// Run a job, keeping the calling thread alive if it panics.
fn run_job(job: Job, stats: &PoolStats) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        stats.panicked.fetch_add(1, Ordering::Relaxed);
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<non-string panic>".to_string());
        error!(panic = %message, "Job panicked");
    }
}
