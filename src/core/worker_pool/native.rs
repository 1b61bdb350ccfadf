//! Native implementation of `WorkerPool` using OS threads.
//!
//! Each worker thread owns a single-threaded tokio runtime so executor work
//! never blocks the caller's async runtime.
//!
//! # Design Principles
//!
//! - **No polling**: workers block on channel recv; futures wake waiters via Condvar/Notify
//! - **Counters first**: load counters and the owner's active-task guard are released
//!   before a task's future resolves, so a returned wait sees settled figures
//! - **Clean shutdown**: dropping the sender unblocks workers naturally

use std::any::Any;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::executor::WorkerExecutor;
use crate::core::future::{task_channel, TaskFailure, TaskFuture};
use crate::core::task::TaskId;

use super::{PoolCounters, PoolError, PoolPrimitive, PoolStats, WorkerJob, WorkerTask};

/// Worker pool with dedicated OS threads.
///
/// # Design
///
/// - **Bounded queue**: a crossbeam channel sized by `max_queue_depth`
/// - **All-or-nothing batches**: a batch is rejected whole if it does not fit
/// - **Lock-free stats**: atomic counters read by the scheduler's selection
pub struct WorkerPool<P, R, E>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    /// Pool configuration.
    config: WorkerPoolConfig,

    /// Task sender (to workers). Option allows clean shutdown by dropping.
    task_tx: Mutex<Option<Sender<WorkerTask<P, R>>>>,

    /// Pool statistics counters (lock-free atomics).
    counters: Arc<PoolCounters>,

    /// Shutdown flag.
    shutdown: Arc<AtomicBool>,

    /// Worker thread handles.
    workers: Mutex<Vec<JoinHandle<()>>>,

    _executor: PhantomData<E>,
}

impl<P, R, E> WorkerPool<P, R, E>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    /// Create a new worker pool, spawning `config.worker_count` OS threads.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Internal` if a worker runtime or thread cannot be created;
    ///   workers spawned so far are released
    pub fn new(config: WorkerPoolConfig, executor: E) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (task_tx, task_rx) = bounded::<WorkerTask<P, R>>(config.max_queue_depth);
        let counters = Arc::new(PoolCounters::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            // On error the sender drops with this frame, so spawned workers exit.
            let worker = spawn_worker(
                worker_id,
                task_rx.clone(),
                Arc::clone(&counters),
                Arc::clone(&shutdown),
                executor.clone(),
                config.thread_stack_size,
            )?;
            workers.push(worker);
        }

        info!(
            worker_count = config.worker_count,
            max_queue_depth = config.max_queue_depth,
            "WorkerPool initialized with dedicated OS threads"
        );

        Ok(Self {
            config,
            task_tx: Mutex::new(Some(task_tx)),
            counters,
            shutdown,
            workers: Mutex::new(workers),
            _executor: PhantomData,
        })
    }

    /// Submit one job. Equivalent to a batch of one.
    ///
    /// # Errors
    ///
    /// Same as [`PoolPrimitive::submit_batch`].
    pub fn submit(&self, job: WorkerJob<P>) -> Result<TaskFuture<R>, PoolError> {
        let mut handles = self.enqueue(vec![job])?;
        handles
            .pop()
            .map(|(_, fut)| fut)
            .ok_or_else(|| PoolError::Internal("empty submission result".into()))
    }

    fn enqueue(&self, jobs: Vec<WorkerJob<P>>) -> Result<Vec<(TaskId, TaskFuture<R>)>, PoolError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::PoolShutdown);
        }

        let task_tx_guard = self.task_tx.lock();
        let Some(task_tx) = task_tx_guard.as_ref() else {
            return Err(PoolError::PoolShutdown);
        };

        let capacity = task_tx.capacity().unwrap_or(usize::MAX);
        if task_tx.len() + jobs.len() > capacity {
            warn!(
                batch = jobs.len(),
                queued = task_tx.len(),
                capacity,
                "Worker pool queue cannot take batch"
            );
            return Err(PoolError::QueueFull);
        }

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let task_id = job.meta.id;
            let cost = u64::from(job.meta.cost);
            let (promise, future) = task_channel(task_id);

            self.counters.queued_tasks.fetch_add(1, Ordering::AcqRel);
            self.counters.queued_units.fetch_add(cost, Ordering::AcqRel);

            match task_tx.try_send(WorkerTask { job, promise }) {
                Ok(()) => {
                    self.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
                    debug!(task_id = %task_id, "Task submitted to worker pool");
                    handles.push((task_id, future));
                }
                Err(err) => {
                    // Producers are serialized by the sender lock, so this means every
                    // worker has exited. The rejected task's promise drops here.
                    self.counters.queued_tasks.fetch_sub(1, Ordering::AcqRel);
                    self.counters.queued_units.fetch_sub(cost, Ordering::AcqRel);
                    return Err(match err {
                        TrySendError::Full(_) => PoolError::QueueFull,
                        TrySendError::Disconnected(_) => PoolError::PoolShutdown,
                    });
                }
            }
        }
        Ok(handles)
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.config.worker_count)
    }

    /// Shut down the pool gracefully.
    ///
    /// Drops the task sender to unblock idle workers, then joins each worker,
    /// waiting up to 2 seconds per worker. Workers that do not exit in time
    /// are detached. Queued tasks that were never started fail as abandoned.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("Shutting down worker pool");

        {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
        }

        let mut workers = self.workers.lock();
        let worker_count = workers.len();

        for (idx, worker) in workers.drain(..).enumerate() {
            let (tx, rx) = std::sync::mpsc::channel();
            let join_thread = thread::spawn(move || {
                let result = worker.join();
                let _ = tx.send(result.is_ok());
            });

            match rx.recv_timeout(Duration::from_secs(2)) {
                Ok(true) => debug!(worker_id = idx, "Worker joined successfully"),
                Ok(false) => warn!(worker_id = idx, "Worker panicked"),
                Err(_) => {
                    warn!(worker_id = idx, "Worker did not exit within timeout - detaching");
                    continue;
                }
            }
            let _ = join_thread.join();
        }

        info!(worker_count = worker_count, "Worker pool shut down complete");
    }
}

impl<P, R, E> PoolPrimitive for WorkerPool<P, R, E>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    type Payload = P;
    type Output = R;

    fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    fn idle_workers(&self) -> usize {
        self.stats().idle_workers()
    }

    fn utilization(&self) -> f64 {
        self.stats().utilization()
    }

    fn pending_tasks(&self) -> usize {
        self.counters.queued_tasks.load(Ordering::Acquire)
    }

    fn can_accept(&self, jobs: usize) -> bool {
        if self.shutdown.load(Ordering::Acquire) {
            return false;
        }
        self.task_tx.lock().as_ref().is_some_and(|tx| {
            tx.len() + jobs <= tx.capacity().unwrap_or(usize::MAX)
        })
    }

    fn submit_batch(&self, jobs: Vec<WorkerJob<P>>) -> Result<Vec<(TaskId, TaskFuture<R>)>, PoolError> {
        self.enqueue(jobs)
    }

    fn terminate(&self) {
        self.shutdown();
    }
}

impl<P, R, E> Drop for WorkerPool<P, R, E>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    fn drop(&mut self) {
        // Signal shutdown but don't join in Drop; explicit shutdown() joins.
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
            debug!("WorkerPool dropped without explicit shutdown - workers will be detached");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Spawn a worker thread with its own current-thread runtime.
fn spawn_worker<P, R, E>(
    worker_id: usize,
    task_rx: Receiver<WorkerTask<P, R>>,
    counters: Arc<PoolCounters>,
    shutdown: Arc<AtomicBool>,
    executor: E,
    stack_size: usize,
) -> Result<JoinHandle<()>, PoolError>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PoolError::Internal(format!("worker {worker_id} runtime: {e}")))?;

    thread::Builder::new()
        .name(format!("pool-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            debug!(worker_id = worker_id, "Worker thread started");

            // When the sender is dropped (shutdown), recv returns Err and the worker exits.
            while let Ok(task) = task_rx.recv() {
                let WorkerTask { job, promise } = task;
                let WorkerJob {
                    meta,
                    payload,
                    guard,
                } = job;
                let cost = u64::from(meta.cost);

                if shutdown.load(Ordering::Acquire) {
                    counters.queued_tasks.fetch_sub(1, Ordering::AcqRel);
                    counters.queued_units.fetch_sub(cost, Ordering::AcqRel);
                    drop(guard);
                    drop(promise);
                    // Queued tasks die with the channel; settle their counters first.
                    let mut abandoned = 1_usize;
                    for rest in task_rx.try_iter() {
                        counters.queued_tasks.fetch_sub(1, Ordering::AcqRel);
                        counters
                            .queued_units
                            .fetch_sub(u64::from(rest.job.meta.cost), Ordering::AcqRel);
                        abandoned += 1;
                    }
                    debug!(worker_id = worker_id, abandoned = abandoned, "Worker shutting down, queued tasks abandoned");
                    break;
                }

                counters.busy_workers.fetch_add(1, Ordering::AcqRel);
                counters.active_units.fetch_add(cost, Ordering::AcqRel);
                counters.queued_tasks.fetch_sub(1, Ordering::AcqRel);
                counters.queued_units.fetch_sub(cost, Ordering::AcqRel);

                let task_id = meta.id;
                debug!(
                    worker_id = worker_id,
                    task_id = %task_id,
                    user_id = %meta.user_id,
                    cost = cost,
                    "Worker executing task"
                );

                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    rt.block_on(executor.execute(payload, meta))
                }))
                .unwrap_or_else(|panic| Err(TaskFailure::Panicked(panic_message(&*panic))));

                if outcome.is_ok() {
                    counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                }
                counters.active_units.fetch_sub(cost, Ordering::AcqRel);
                counters.busy_workers.fetch_sub(1, Ordering::AcqRel);
                drop(guard);

                debug!(
                    worker_id = worker_id,
                    task_id = %task_id,
                    ok = outcome.is_ok(),
                    "Worker completed task"
                );
                promise.complete(outcome);
            }

            debug!(worker_id = worker_id, "Worker thread exiting");
        })
        .map_err(|e| PoolError::Internal(format!("spawn worker {worker_id}: {e}")))
}
