//! Pool and scheduler configuration structures.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Environment variable holding the path of the JSON scheduler configuration.
pub const CONFIG_PATH_ENV: &str = "POOL_SCHEDULER_CONFIG";

const DEFAULT_MAX_QUEUE_DEPTH: usize = 1024;
const DEFAULT_THREAD_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Resource class of a pool and of the tasks routed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolType {
    /// CPU-bound work.
    Cpu,
    /// IO-bound work.
    Io,
    /// GPU-bound work.
    Gpu,
}

impl PoolType {
    /// Stable lowercase name, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Io => "io",
            Self::Gpu => "gpu",
        }
    }
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_workers_per_pool() -> usize {
    num_cpus::get()
}

const fn default_max_queue_depth() -> usize {
    DEFAULT_MAX_QUEUE_DEPTH
}

const fn default_thread_stack_size() -> usize {
    DEFAULT_THREAD_STACK_SIZE
}

/// Provisioning for one pool type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTypeConfig {
    /// Number of pools to create for this type.
    pub pool_count: usize,
    /// Worker threads per pool. Defaults to the host CPU count.
    #[serde(default = "default_workers_per_pool")]
    pub workers_per_pool: usize,
    /// Maximum queued tasks per pool before submissions are rejected.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,
    /// Stack size for each worker thread, in bytes.
    #[serde(default = "default_thread_stack_size")]
    pub thread_stack_size: usize,
}

impl PoolTypeConfig {
    /// Create a config with the given pool and worker counts and default queue settings.
    #[must_use]
    pub const fn new(pool_count: usize, workers_per_pool: usize) -> Self {
        Self {
            pool_count,
            workers_per_pool,
            max_queue_depth: DEFAULT_MAX_QUEUE_DEPTH,
            thread_stack_size: DEFAULT_THREAD_STACK_SIZE,
        }
    }

    /// Set the per-pool queue depth.
    #[must_use]
    pub const fn with_max_queue_depth(mut self, depth: usize) -> Self {
        self.max_queue_depth = depth;
        self
    }

    /// Validate the provisioning values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first zero-valued field.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_count == 0 {
            return Err("pool_count must be greater than 0".into());
        }
        if self.workers_per_pool == 0 {
            return Err("workers_per_pool must be greater than 0".into());
        }
        if self.max_queue_depth == 0 {
            return Err("max_queue_depth must be greater than 0".into());
        }
        if self.thread_stack_size == 0 {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Worker pool settings for one pool of this type.
    #[must_use]
    pub fn worker_pool_config(&self) -> WorkerPoolConfig {
        WorkerPoolConfig::new()
            .with_worker_count(self.workers_per_pool)
            .with_max_queue_depth(self.max_queue_depth)
            .with_thread_stack_size(self.thread_stack_size)
    }
}

/// Root scheduler configuration: pool provisioning per pool type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Map of pool type to provisioning.
    pub pools: BTreeMap<PoolType, PoolTypeConfig>,
}

impl PoolConfig {
    /// Empty configuration; add pool types with [`PoolConfig::with_pool_type`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the provisioning for a pool type.
    #[must_use]
    pub fn with_pool_type(mut self, pool_type: PoolType, cfg: PoolTypeConfig) -> Self {
        self.pools.insert(pool_type, cfg);
        self
    }

    /// Validate all pool types and ensure at least one exists.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid entry.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("at least one pool type must be defined".into());
        }
        for (pool_type, cfg) in &self.pools {
            cfg.validate()
                .map_err(|e| format!("pool type `{pool_type}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or its contents are invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading pool config {}", path.display()))?;
        Self::from_json_str(&raw)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("loading pool config {}", path.display()))
    }

    /// Load `.env` (if present) and read the file named by [`CONFIG_PATH_ENV`].
    ///
    /// # Errors
    ///
    /// Fails if the variable is unset or the file is unreadable or invalid.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        let path = std::env::var(CONFIG_PATH_ENV)
            .with_context(|| format!("{CONFIG_PATH_ENV} is not set"))?;
        Self::from_json_file(path)
    }

    /// Provisioning for a pool type, if configured.
    #[must_use]
    pub fn get(&self, pool_type: PoolType) -> Option<&PoolTypeConfig> {
        self.pools.get(&pool_type)
    }
}

/// Settings for a single native worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of dedicated worker threads.
    pub worker_count: usize,
    /// Bounded queue capacity.
    pub max_queue_depth: usize,
    /// Stack size per worker thread, in bytes.
    pub thread_stack_size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: default_workers_per_pool(),
            max_queue_depth: DEFAULT_MAX_QUEUE_DEPTH,
            thread_stack_size: DEFAULT_THREAD_STACK_SIZE,
        }
    }
}

impl WorkerPoolConfig {
    /// Defaults: one worker per CPU, queue depth 1024, 2 MiB stacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the queue depth.
    #[must_use]
    pub const fn with_max_queue_depth(mut self, max_queue_depth: usize) -> Self {
        self.max_queue_depth = max_queue_depth;
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, thread_stack_size: usize) -> Self {
        self.thread_stack_size = thread_stack_size;
        self
    }

    /// Validate worker pool settings.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.max_queue_depth == 0 {
            return Err("max_queue_depth must be greater than 0".into());
        }
        if self.thread_stack_size == 0 {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }
}
