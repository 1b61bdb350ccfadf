//! Core scheduling abstractions: pools, users, tasks, futures and the scheduler.

pub mod audit;
pub mod error;
pub mod executor;
pub mod future;
pub mod index;
pub mod pool;
pub mod scheduler;
pub mod task;
pub mod user;
pub mod worker_pool;

pub use audit::{build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use error::{AppResult, SchedulerError};
pub use executor::WorkerExecutor;
pub use future::{task_channel, FutureStatus, TaskFailure, TaskFuture, TaskPromise};
pub use index::PoolTypeIndex;
pub use pool::{Pool, PoolId, PoolLoad, PoolSnapshot};
pub use scheduler::{DrainReport, SchedulerState, SharedScheduler, TaskHandle, WorkerPoolScheduler};
pub use task::{Task, TaskId, TaskMetadata};
pub use user::{ActiveTaskGuard, User};
pub use worker_pool::{PoolError, PoolPrimitive, PoolStats, WorkerJob, WorkerPool};
