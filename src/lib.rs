//! # Prometheus Pool Scheduler
//!
//! A dynamic worker pool scheduler. It owns a fixed set of worker pools grouped
//! by [`PoolType`](config::PoolType), binds every user (logical tenant) to one
//! pool of each type, and routes each submission to that user's pool.
//!
//! ## How routing works
//!
//! - **Provisioning**: a [`PoolConfig`](config::PoolConfig) lists, per pool type,
//!   how many pools to create and how many workers each gets
//! - **Binding**: a user seen for the first time is bound to the least-utilized
//!   pool of every type; later calls keep that binding while the user has work
//!   in flight
//! - **Rebalancing**: once a user is idle for a type, its binding drifts to the
//!   currently best pool, with no background sweep
//! - **Selection ladder**: most idle workers, then lowest utilization, then
//!   fewest bound users, then fewest pending tasks, then lowest pool id, each
//!   figure per worker
//! - **Draining**: `wait_all`, `wait_all_for_user` and `terminate` wait on
//!   tracked futures; `terminate` then releases every pool
//!
//! ## Example
//!
//! ```rust,ignore
//! use prometheus_pool_scheduler::config::{PoolConfig, PoolType, PoolTypeConfig};
//! use prometheus_pool_scheduler::core::{SchedulerState, Task};
//!
//! let config = PoolConfig::new()
//!     .with_pool_type(PoolType::Cpu, PoolTypeConfig::new(2, 4))
//!     .with_pool_type(PoolType::Io, PoolTypeConfig::new(1, 16));
//!
//! let mut scheduler = SchedulerState::with_executor(&config, my_executor)?;
//!
//! let (_id, fut) = scheduler.submit(Task::new("alice", PoolType::Cpu, job))?;
//! let handles = scheduler.submit_multi_pool_batch(vec![
//!     Task::new("alice", PoolType::Cpu, crunch),
//!     Task::new("alice", PoolType::Io, fetch),
//! ])?;
//!
//! let result = fut.wait()?;
//! scheduler.wait_all_for_user("alice");
//! scheduler.terminate();
//! ```
//!
//! For complete examples, see `tests/scheduler_test.rs`.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Configuration models for pool types and worker pools.
pub mod config;
/// Core scheduling abstractions and the scheduler.
pub mod core;
/// Builders to construct pools from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;
