//! Tests for the pool type index

use prometheus_pool_scheduler::config::PoolType;
use prometheus_pool_scheduler::core::{PoolId, PoolTypeIndex};

#[test]
fn test_empty_index() {
    let index = PoolTypeIndex::new();
    assert!(index.is_empty());
    assert!(!index.contains(PoolType::Cpu));
    assert_eq!(index.pools_of(PoolType::Cpu).count(), 0);
}

#[test]
fn test_duplicate_registration_is_ignored() {
    let mut index = PoolTypeIndex::new();
    index.register(PoolType::Io, PoolId::new(1));
    index.register(PoolType::Io, PoolId::new(1));
    assert_eq!(index.len(), 1);
    assert!(index.contains(PoolType::Io));
}
