//! Configuration models for pool types, pools, and worker pools.

pub mod pool;

pub use pool::{PoolConfig, PoolType, PoolTypeConfig, WorkerPoolConfig, CONFIG_PATH_ENV};
