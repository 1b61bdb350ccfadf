//! Tests for utility functions and small value types

use prometheus_pool_scheduler::core::{FutureStatus, PoolId, TaskId};
use prometheus_pool_scheduler::util::{init_tracing, now_ms};

#[test]
fn test_now_ms_is_monotonic_enough() {
    let a = now_ms();
    let b = now_ms();
    assert!(a > 0);
    assert!(b >= a);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialised twice without panicking");
}

#[test]
fn test_task_ids_are_unique() {
    let a = TaskId::new();
    let b = TaskId::new();
    assert_ne!(a, b);
    assert_eq!(a.to_string(), a.as_uuid().to_string());
}

#[test]
fn test_pool_id_ordering() {
    assert!(PoolId::new(0) < PoolId::new(1));
    assert_eq!(PoolId::new(5).as_u64(), 5);
    assert_eq!(serde_json::to_string(&PoolId::new(5)).unwrap(), "5");
}

#[test]
fn test_future_status_terminal() {
    assert!(!FutureStatus::Pending.is_terminal());
    assert!(FutureStatus::Resolved.is_terminal());
    assert!(FutureStatus::Failed.is_terminal());
}
