//! Tests for error types

use prometheus_pool_scheduler::config::PoolType;
use prometheus_pool_scheduler::core::{PoolError, SchedulerError, TaskFailure};

#[test]
fn test_unknown_pool_type_error() {
    let err = SchedulerError::UnknownPoolType(PoolType::Gpu);
    assert_eq!(format!("{}", err), "no pools registered for pool type `gpu`");
}

#[test]
fn test_mixed_users_error() {
    let err = SchedulerError::MixedUsers {
        expected: "u1".to_string(),
        found: "u2".to_string(),
    };
    assert_eq!(format!("{}", err), "batch mixes users: expected `u1`, found `u2`");
}

#[test]
fn test_mixed_pool_types_error() {
    let err = SchedulerError::MixedPoolTypes {
        expected: PoolType::Cpu,
        found: PoolType::Io,
    };
    assert_eq!(
        format!("{}", err),
        "same-pool batch mixes pool types: expected `cpu`, found `io`"
    );
}

#[test]
fn test_terminated_and_empty_errors() {
    assert_eq!(format!("{}", SchedulerError::Terminated), "scheduler has been terminated");
    assert_eq!(format!("{}", SchedulerError::EmptyBatch), "empty batch");
}

#[test]
fn test_pool_error_converts() {
    let err: SchedulerError = PoolError::QueueFull.into();
    assert!(matches!(err, SchedulerError::Pool(PoolError::QueueFull)));
    assert_eq!(format!("{}", err), "pool error: task queue is full");
}

#[test]
fn test_task_failure_display() {
    assert_eq!(
        TaskFailure::execution("disk full").to_string(),
        "task execution failed: disk full"
    );
    assert_eq!(TaskFailure::Abandoned.to_string(), "task abandoned before completion");
}

#[test]
fn test_app_result_wraps_scheduler_error() {
    use anyhow::Context;
    use prometheus_pool_scheduler::core::AppResult;

    let result: AppResult<()> = Err(SchedulerError::Terminated).context("submitting report job");
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "submitting report job");
    assert!(err.downcast_ref::<SchedulerError>().is_some());
}
