//! Worker pool primitive: the capability the scheduler consumes, and its native
//! implementation with dedicated worker threads.
//!
//! The scheduler only talks to pools through [`PoolPrimitive`], so tests and
//! alternative backends can plug in their own pools.
//!
//! # Example
//!
//! ```rust,ignore
//! use prometheus_pool_scheduler::core::{PoolPrimitive, WorkerPool};
//! use prometheus_pool_scheduler::config::WorkerPoolConfig;
//!
//! let pool = WorkerPool::new(
//!     WorkerPoolConfig::new().with_worker_count(4).with_max_queue_depth(256),
//!     my_executor,
//! )?;
//! let handles = pool.submit_batch(jobs)?;
//! for (_id, fut) in handles {
//!     fut.wait()?;
//! }
//! pool.terminate();
//! ```

mod native;

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::core::future::{TaskFuture, TaskPromise};
use crate::core::task::{TaskId, TaskMetadata};
use crate::core::user::ActiveTaskGuard;

pub use native::WorkerPool;

/// Errors that can occur when using a worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The task queue cannot take the submitted batch.
    QueueFull,

    /// The pool has been shut down.
    PoolShutdown,

    /// Configuration validation failed.
    InvalidConfig(String),

    /// Internal error (worker thread or runtime could not be created, channel closed, etc.).
    Internal(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "task queue is full"),
            Self::PoolShutdown => write!(f, "pool has been shut down"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for PoolError {}

/// A task handed to a pool: scheduled metadata, payload and the owner's
/// active-task guard, which the pool releases when the task finishes.
#[derive(Debug)]
pub struct WorkerJob<P> {
    /// Scheduled metadata.
    pub meta: TaskMetadata,
    /// Caller payload.
    pub payload: P,
    /// Active-task accounting for the submitting user.
    pub guard: Option<ActiveTaskGuard>,
}

impl<P> WorkerJob<P> {
    /// Job without user accounting.
    pub const fn new(meta: TaskMetadata, payload: P) -> Self {
        Self {
            meta,
            payload,
            guard: None,
        }
    }

    pub(crate) fn with_guard(mut self, guard: ActiveTaskGuard) -> Self {
        self.guard = Some(guard);
        self
    }
}

/// Capability interface of a worker pool as seen by the scheduler.
pub trait PoolPrimitive {
    /// Task payload type.
    type Payload;
    /// Task result type.
    type Output;

    /// Fixed number of workers (at least one).
    fn worker_count(&self) -> usize;

    /// Workers not currently executing a task.
    fn idle_workers(&self) -> usize;

    /// Aggregate cost of active plus pending work.
    fn utilization(&self) -> f64;

    /// Tasks accepted but not yet started.
    fn pending_tasks(&self) -> usize;

    /// Whether a batch of `jobs` tasks would be accepted right now. Only
    /// submissions free capacity up, so a `true` holds until the caller's
    /// next submission.
    fn can_accept(&self, jobs: usize) -> bool;

    /// Accept a batch, returning one `(TaskId, TaskFuture)` per job in order.
    ///
    /// # Errors
    ///
    /// Fails without queuing any job if the batch cannot be accepted.
    fn submit_batch(
        &self,
        jobs: Vec<WorkerJob<Self::Payload>>,
    ) -> Result<Vec<(TaskId, TaskFuture<Self::Output>)>, PoolError>;

    /// Release the pool's workers, blocking until they exit.
    fn terminate(&self);
}

/// Statistics about pool utilization and throughput.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,

    /// Workers currently executing a task.
    pub busy_workers: usize,

    /// Tasks waiting in the queue.
    pub queued_tasks: usize,

    /// Cost units of executing tasks.
    pub active_units: u64,

    /// Cost units of queued tasks.
    pub queued_units: u64,

    /// Total tasks that resolved successfully.
    pub completed_tasks: u64,

    /// Total tasks that failed or panicked.
    pub failed_tasks: u64,

    /// Total tasks submitted.
    pub submitted_tasks: u64,
}

impl PoolStats {
    /// Workers not executing a task.
    #[must_use]
    pub const fn idle_workers(&self) -> usize {
        self.worker_count.saturating_sub(self.busy_workers)
    }

    /// Aggregate active plus pending cost.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn utilization(&self) -> f64 {
        (self.active_units + self.queued_units) as f64
    }
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub busy_workers: AtomicUsize,
    pub queued_tasks: AtomicUsize,
    pub active_units: AtomicU64,
    pub queued_units: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize) -> PoolStats {
        PoolStats {
            worker_count,
            busy_workers: self.busy_workers.load(Ordering::Acquire),
            queued_tasks: self.queued_tasks.load(Ordering::Acquire),
            active_units: self.active_units.load(Ordering::Acquire),
            queued_units: self.queued_units.load(Ordering::Acquire),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
        }
    }
}

/// A job travelling through the queue together with its completion side.
pub(crate) struct WorkerTask<P, R> {
    pub job: WorkerJob<P>,
    pub promise: TaskPromise<R>,
}
