//! Scheduler-side pool records and the load ordering used to pick pools.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PoolType;
use crate::core::worker_pool::PoolPrimitive;

/// Opaque pool identifier, unique within a scheduler and totally ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(u64);

impl PoolId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool-{}", self.0)
    }
}

/// One worker pool owned by the scheduler, with the users currently bound to it.
pub struct Pool<W> {
    id: PoolId,
    pool_type: PoolType,
    primitive: W,
    bound_users: BTreeSet<String>,
}

impl<W: PoolPrimitive> Pool<W> {
    pub(crate) const fn new(id: PoolId, pool_type: PoolType, primitive: W) -> Self {
        Self {
            id,
            pool_type,
            primitive,
            bound_users: BTreeSet::new(),
        }
    }

    /// Pool identifier.
    #[must_use]
    pub const fn id(&self) -> PoolId {
        self.id
    }

    /// Pool type.
    #[must_use]
    pub const fn pool_type(&self) -> PoolType {
        self.pool_type
    }

    /// Underlying worker pool.
    pub const fn primitive(&self) -> &W {
        &self.primitive
    }

    /// Fixed worker count.
    pub fn worker_count(&self) -> usize {
        self.primitive.worker_count()
    }

    /// Workers not executing a task.
    pub fn idle_workers(&self) -> usize {
        self.primitive.idle_workers()
    }

    /// Tasks accepted but not yet started.
    pub fn pending_tasks(&self) -> usize {
        self.primitive.pending_tasks()
    }

    /// Aggregate active plus pending cost.
    pub fn utilization(&self) -> f64 {
        self.primitive.utilization()
    }

    /// Users currently bound here.
    #[must_use]
    pub const fn bound_users(&self) -> &BTreeSet<String> {
        &self.bound_users
    }

    /// Whether `user_id` is bound here.
    #[must_use]
    pub fn is_bound(&self, user_id: &str) -> bool {
        self.bound_users.contains(user_id)
    }

    pub(crate) fn attach(&mut self, user_id: &str) {
        self.bound_users.insert(user_id.to_string());
    }

    pub(crate) fn detach(&mut self, user_id: &str) {
        self.bound_users.remove(user_id);
    }

    /// Load figures normalised by worker count. When `exclude_user` is bound
    /// here it is left out of the user count, so a user re-evaluating its own
    /// pool compares it as if it were not there.
    pub fn load(&self, exclude_user: Option<&str>) -> PoolLoad {
        let mut users = self.bound_users.len();
        if exclude_user.is_some_and(|u| self.is_bound(u)) {
            users -= 1;
        }
        PoolLoad::new(
            self.worker_count(),
            self.idle_workers(),
            self.utilization(),
            users,
            self.pending_tasks(),
        )
    }

    /// Serializable view of the pool.
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            id: self.id,
            pool_type: self.pool_type,
            worker_count: self.worker_count(),
            idle_workers: self.idle_workers(),
            pending_tasks: self.pending_tasks(),
            utilization: self.utilization(),
            bound_users: self.bound_users.iter().cloned().collect(),
        }
    }
}

/// Per-worker load fractions of a pool, ordered best-first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolLoad {
    /// Idle workers / workers. Higher is better.
    pub idle_fraction: f64,
    /// Utilization / workers. Lower is better.
    pub utilization_fraction: f64,
    /// Bound users / workers. Lower is better.
    pub user_fraction: f64,
    /// Pending tasks / workers. Lower is better.
    pub pending_fraction: f64,
}

impl PoolLoad {
    /// Normalise raw figures by `worker_count` (treated as at least one).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(
        worker_count: usize,
        idle_workers: usize,
        utilization: f64,
        bound_users: usize,
        pending_tasks: usize,
    ) -> Self {
        let workers = worker_count.max(1) as f64;
        Self {
            idle_fraction: idle_workers as f64 / workers,
            utilization_fraction: utilization / workers,
            user_fraction: bound_users as f64 / workers,
            pending_fraction: pending_tasks as f64 / workers,
        }
    }

    /// `Less` when `self` is the better pool: more idle, then less utilized,
    /// then fewer users, then fewer pending tasks.
    #[must_use]
    pub fn preference(&self, other: &Self) -> Ordering {
        other
            .idle_fraction
            .total_cmp(&self.idle_fraction)
            .then_with(|| self.utilization_fraction.total_cmp(&other.utilization_fraction))
            .then_with(|| self.user_fraction.total_cmp(&other.user_fraction))
            .then_with(|| self.pending_fraction.total_cmp(&other.pending_fraction))
    }
}

/// Pool state for listings and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Pool identifier.
    pub id: PoolId,
    /// Pool type.
    pub pool_type: PoolType,
    /// Worker count.
    pub worker_count: usize,
    /// Idle workers.
    pub idle_workers: usize,
    /// Pending tasks.
    pub pending_tasks: usize,
    /// Active plus pending cost.
    pub utilization: f64,
    /// Bound users, sorted.
    pub bound_users: Vec<String>,
}
