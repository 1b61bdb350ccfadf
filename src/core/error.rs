//! Error types for scheduler operations.

use thiserror::Error;

use crate::config::PoolType;
use crate::core::worker_pool::PoolError;

/// Errors produced by the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No pool of the requested type is registered.
    #[error("no pools registered for pool type `{0}`")]
    UnknownPoolType(PoolType),
    /// The user has no record; scheduling state is inconsistent.
    #[error("user `{0}` is not registered")]
    UnknownUser(String),
    /// Configuration failed validation at bootstrap.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A batch submission contained no tasks.
    #[error("empty batch")]
    EmptyBatch,
    /// A batch mixed tasks from different users.
    #[error("batch mixes users: expected `{expected}`, found `{found}`")]
    MixedUsers {
        /// User of the first task.
        expected: String,
        /// Offending user.
        found: String,
    },
    /// A same-pool batch mixed pool types.
    #[error("same-pool batch mixes pool types: expected `{expected}`, found `{found}`")]
    MixedPoolTypes {
        /// Pool type of the first task.
        expected: PoolType,
        /// Offending pool type.
        found: PoolType,
    },
    /// The scheduler has been terminated.
    #[error("scheduler has been terminated")]
    Terminated,
    /// Worker pool failure.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
