//! Builders to provision pools from configuration.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::{PoolConfig, PoolType, PoolTypeConfig};
use crate::core::{
    Pool, PoolError, PoolId, PoolPrimitive, PoolTypeIndex, SchedulerError, WorkerExecutor,
    WorkerPool,
};

/// Pools created at bootstrap together with their type index.
pub struct ProvisionedPools<W> {
    /// Pool table keyed by id.
    pub pools: BTreeMap<PoolId, Pool<W>>,
    /// Pool type → pool ids.
    pub index: PoolTypeIndex,
}

/// Create `pool_count` pools for every configured pool type using `factory`.
///
/// Pool types are visited in order and ids are assigned sequentially, so the
/// same configuration always yields the same ids.
///
/// # Errors
///
/// - `SchedulerError::InvalidConfig` if the configuration fails validation or
///   a pool reports zero workers
/// - `SchedulerError::Pool` on the first factory failure; pools created so far
///   are dropped
pub fn build_pools<W, F>(cfg: &PoolConfig, mut factory: F) -> Result<ProvisionedPools<W>, SchedulerError>
where
    W: PoolPrimitive,
    F: FnMut(PoolType, &PoolTypeConfig) -> Result<W, PoolError>,
{
    cfg.validate().map_err(SchedulerError::InvalidConfig)?;

    let mut pools = BTreeMap::new();
    let mut index = PoolTypeIndex::new();
    let mut next_id = 0_u64;

    for (&pool_type, type_cfg) in &cfg.pools {
        for _ in 0..type_cfg.pool_count {
            let id = PoolId::new(next_id);
            next_id += 1;

            let primitive = factory(pool_type, type_cfg)?;
            if primitive.worker_count() == 0 {
                return Err(SchedulerError::InvalidConfig(format!(
                    "pool {id} of type `{pool_type}` has no workers"
                )));
            }
            debug!(pool_id = %id, pool_type = %pool_type, workers = primitive.worker_count(), "Pool provisioned");

            index.register(pool_type, id);
            pools.insert(id, Pool::new(id, pool_type, primitive));
        }
    }

    info!(pools = pools.len(), pool_types = cfg.pools.len(), "Worker pools provisioned");
    Ok(ProvisionedPools { pools, index })
}

/// Factory building native [`WorkerPool`]s that share clones of one executor.
pub fn worker_pool_factory<P, R, E>(
    executor: E,
) -> impl FnMut(PoolType, &PoolTypeConfig) -> Result<WorkerPool<P, R, E>, PoolError>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    move |_pool_type, cfg| WorkerPool::new(cfg.worker_pool_config(), executor.clone())
}
