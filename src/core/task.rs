//! Task submission records and scheduled task metadata.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PoolType;
use crate::core::pool::PoolId;

/// Unique task identifier (random 128-bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A task as submitted by a caller: owner, target pool type and opaque payload.
#[derive(Debug, Clone)]
pub struct Task<P> {
    user_id: String,
    pool_type: PoolType,
    payload: P,
    cost: u32,
}

impl<P> Task<P> {
    /// New task with a cost of one resource unit.
    pub fn new(user_id: impl Into<String>, pool_type: PoolType, payload: P) -> Self {
        Self {
            user_id: user_id.into(),
            pool_type,
            payload,
            cost: 1,
        }
    }

    /// Set the resource cost reported to the pool's utilization figure.
    #[must_use]
    pub const fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// Submitting user.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Target pool type.
    #[must_use]
    pub const fn pool_type(&self) -> PoolType {
        self.pool_type
    }

    /// Resource cost in units.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Borrow the payload.
    #[must_use]
    pub const fn payload(&self) -> &P {
        &self.payload
    }

    pub(crate) fn into_payload(self) -> P {
        self.payload
    }
}

/// Metadata stamped on a task once it has been scheduled to a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Unique task identifier.
    pub id: TaskId,
    /// Submitting user.
    pub user_id: String,
    /// Pool type the task targets.
    pub pool_type: PoolType,
    /// Pool the task was scheduled to. Never changes after submission.
    pub pool_id: PoolId,
    /// Resource cost in units.
    pub cost: u32,
    /// Creation timestamp in milliseconds since epoch.
    pub created_at_ms: u128,
}
