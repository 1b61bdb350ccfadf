//! Tests for builder modules

use prometheus_pool_scheduler::builders::build_pools;
use prometheus_pool_scheduler::config::{PoolConfig, PoolType, PoolTypeConfig};
use prometheus_pool_scheduler::core::{
    PoolError, PoolId, PoolPrimitive, SchedulerError, TaskFuture, TaskId, WorkerJob,
};

/// Pool that only reports a fixed worker count.
struct FixedPool {
    workers: usize,
}

impl PoolPrimitive for FixedPool {
    type Payload = ();
    type Output = ();

    fn worker_count(&self) -> usize {
        self.workers
    }

    fn idle_workers(&self) -> usize {
        self.workers
    }

    fn utilization(&self) -> f64 {
        0.0
    }

    fn pending_tasks(&self) -> usize {
        0
    }

    fn can_accept(&self, _jobs: usize) -> bool {
        false
    }

    fn submit_batch(&self, _jobs: Vec<WorkerJob<()>>) -> Result<Vec<(TaskId, TaskFuture<()>)>, PoolError> {
        Err(PoolError::PoolShutdown)
    }

    fn terminate(&self) {}
}

#[test]
fn test_build_pools_sequential_ids() {
    let cfg = PoolConfig::new()
        .with_pool_type(PoolType::Gpu, PoolTypeConfig::new(1, 1))
        .with_pool_type(PoolType::Cpu, PoolTypeConfig::new(2, 4));

    let mut calls = Vec::new();
    let provisioned = build_pools(&cfg, |pool_type, type_cfg: &PoolTypeConfig| {
        calls.push(pool_type);
        Ok(FixedPool {
            workers: type_cfg.workers_per_pool,
        })
    })
    .unwrap();

    assert_eq!(calls, vec![PoolType::Cpu, PoolType::Cpu, PoolType::Gpu]);
    assert_eq!(provisioned.pools.len(), 3);
    assert_eq!(
        provisioned.index.pools_of(PoolType::Gpu).collect::<Vec<_>>(),
        vec![PoolId::new(2)]
    );
    assert_eq!(provisioned.pools[&PoolId::new(2)].worker_count(), 1);
    assert_eq!(provisioned.pools[&PoolId::new(0)].pool_type(), PoolType::Cpu);
}

#[test]
fn test_build_pools_rejects_workerless_pool() {
    let cfg = PoolConfig::new().with_pool_type(PoolType::Io, PoolTypeConfig::new(1, 2));
    let result = build_pools(&cfg, |_, _: &PoolTypeConfig| Ok(FixedPool { workers: 0 }));
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[test]
fn test_build_pools_stops_at_first_failure() {
    let cfg = PoolConfig::new().with_pool_type(PoolType::Cpu, PoolTypeConfig::new(3, 1));
    let mut created = 0;
    let result = build_pools(&cfg, |_, _: &PoolTypeConfig| {
        created += 1;
        if created == 2 {
            return Err(PoolError::Internal("out of threads".into()));
        }
        Ok(FixedPool { workers: 1 })
    });
    assert!(matches!(result, Err(SchedulerError::Pool(PoolError::Internal(_)))));
    assert_eq!(created, 2);
}
