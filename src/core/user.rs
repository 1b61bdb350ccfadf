//! Per-caller binding and in-flight accounting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::PoolType;
use crate::core::pool::PoolId;

/// A logical caller: its current pool per type and its in-flight task counts.
#[derive(Debug)]
pub struct User {
    id: String,
    pool_of_type: HashMap<PoolType, PoolId>,
    active_tasks: HashMap<PoolType, Arc<AtomicUsize>>,
}

impl User {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pool_of_type: HashMap::new(),
            active_tasks: HashMap::new(),
        }
    }

    /// Caller-supplied identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current pool for `pool_type`, if bound.
    #[must_use]
    pub fn binding(&self, pool_type: PoolType) -> Option<PoolId> {
        self.pool_of_type.get(&pool_type).copied()
    }

    /// All current bindings.
    pub fn bindings(&self) -> impl Iterator<Item = (PoolType, PoolId)> + '_ {
        self.pool_of_type.iter().map(|(t, id)| (*t, *id))
    }

    /// Tasks of `pool_type` submitted by this user that have not finished.
    #[must_use]
    pub fn active_tasks(&self, pool_type: PoolType) -> usize {
        self.active_tasks
            .get(&pool_type)
            .map_or(0, |c| c.load(Ordering::Acquire))
    }

    /// True when no task of `pool_type` is in flight.
    #[must_use]
    pub fn is_idle(&self, pool_type: PoolType) -> bool {
        self.active_tasks(pool_type) == 0
    }

    /// Replace the binding for `pool_type`, returning the previous pool.
    pub(crate) fn bind(&mut self, pool_type: PoolType, pool_id: PoolId) -> Option<PoolId> {
        self.pool_of_type.insert(pool_type, pool_id)
    }

    /// Count one more in-flight task of `pool_type` until the guard drops.
    pub(crate) fn track(&mut self, pool_type: PoolType) -> ActiveTaskGuard {
        let counter = self.active_tasks.entry(pool_type).or_default();
        ActiveTaskGuard::acquire(Arc::clone(counter))
    }
}

/// Holds one unit of a user's active-task count; released on drop.
///
/// Travels with the task into the worker, which drops it once the task
/// reaches a terminal state.
#[derive(Debug)]
pub struct ActiveTaskGuard {
    counter: Arc<AtomicUsize>,
}

impl ActiveTaskGuard {
    fn acquire(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self { counter }
    }
}

impl Drop for ActiveTaskGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}
