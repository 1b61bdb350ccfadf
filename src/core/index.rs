//! Reverse index from pool type to the pools of that type.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::PoolType;
use crate::core::pool::PoolId;

/// Pool type → ordered set of pool ids. Append-only after bootstrap.
#[derive(Debug, Clone, Default)]
pub struct PoolTypeIndex {
    pools: BTreeMap<PoolType, BTreeSet<PoolId>>,
}

impl PoolTypeIndex {
    /// Empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool under its type.
    pub fn register(&mut self, pool_type: PoolType, pool_id: PoolId) {
        self.pools.entry(pool_type).or_default().insert(pool_id);
    }

    /// Pools of `pool_type` in id order; empty if none are registered.
    pub fn pools_of(&self, pool_type: PoolType) -> impl Iterator<Item = PoolId> + '_ {
        self.pools.get(&pool_type).into_iter().flatten().copied()
    }

    /// Whether at least one pool of `pool_type` exists.
    #[must_use]
    pub fn contains(&self, pool_type: PoolType) -> bool {
        self.pools.get(&pool_type).is_some_and(|ids| !ids.is_empty())
    }

    /// Pool types with registered pools, in order.
    pub fn pool_types(&self) -> impl Iterator<Item = PoolType> + '_ {
        self.pools.keys().copied()
    }

    /// Total registered pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.values().map(BTreeSet::len).sum()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
