//! The scheduler: pool table, user bindings, least-utilized selection,
//! submission, draining and termination.
//!
//! All bookkeeping happens through `&mut SchedulerState`, so scheduling
//! decisions never interleave. Execution runs on the pools' own workers; the
//! only blocking points are the `wait_all*` family and [`SchedulerState::terminate`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::builders::{build_pools, worker_pool_factory};
use crate::config::{PoolConfig, PoolType, PoolTypeConfig};
use crate::core::audit::{build_audit_event, AuditAction, AuditSink};
use crate::core::future::{FutureStatus, TaskFuture};
use crate::core::index::PoolTypeIndex;
use crate::core::pool::{Pool, PoolId, PoolSnapshot};
use crate::core::task::{Task, TaskId, TaskMetadata};
use crate::core::user::User;
use crate::core::worker_pool::{PoolError, PoolPrimitive, WorkerJob, WorkerPool};
use crate::core::{SchedulerError, WorkerExecutor};
use crate::util::clock::now_ms;

/// Scheduler shared between threads.
pub type SharedScheduler<W> = Arc<Mutex<SchedulerState<W>>>;

/// Scheduler over native worker pools.
pub type WorkerPoolScheduler<P, R, E> = SchedulerState<WorkerPool<P, R, E>>;

/// Submission handle: task id and its future.
pub type TaskHandle<R> = (TaskId, TaskFuture<R>);

/// Outcome counts of a drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Tasks that resolved successfully.
    pub resolved: usize,
    /// Tasks that failed, panicked or were abandoned.
    pub failed: usize,
}

impl DrainReport {
    fn record(&mut self, status: FutureStatus) {
        match status {
            FutureStatus::Resolved => self.resolved += 1,
            FutureStatus::Failed => self.failed += 1,
            FutureStatus::Pending => {}
        }
    }

    /// Tasks waited on.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.resolved + self.failed
    }
}

/// A submitted task as remembered by the scheduler for bulk waits.
struct TrackedTask<R> {
    user_id: String,
    future: TaskFuture<R>,
}

/// Owns the pools and the user table, and routes tasks.
pub struct SchedulerState<W: PoolPrimitive> {
    pools: BTreeMap<PoolId, Pool<W>>,
    index: PoolTypeIndex,
    users: HashMap<String, User>,
    tracked: Vec<TrackedTask<W::Output>>,
    audit: Option<Box<dyn AuditSink>>,
    terminated: bool,
}

impl<P, R, E> SchedulerState<WorkerPool<P, R, E>>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    /// Bootstrap native worker pools that all run `executor`.
    ///
    /// # Errors
    ///
    /// See [`SchedulerState::new`].
    pub fn with_executor(config: &PoolConfig, executor: E) -> Result<Self, SchedulerError> {
        Self::new(config, worker_pool_factory(executor))
    }
}

impl<W: PoolPrimitive> SchedulerState<W> {
    /// Provision every pool described by `config` through `factory`.
    ///
    /// # Errors
    ///
    /// Fails fast on invalid configuration or the first pool that cannot be created.
    pub fn new<F>(config: &PoolConfig, factory: F) -> Result<Self, SchedulerError>
    where
        F: FnMut(PoolType, &PoolTypeConfig) -> Result<W, PoolError>,
    {
        let provisioned = build_pools(config, factory)?;
        Ok(Self {
            pools: provisioned.pools,
            index: provisioned.index,
            users: HashMap::new(),
            tracked: Vec::new(),
            audit: None,
            terminated: false,
        })
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, sink: impl AuditSink + 'static) -> Self {
        self.audit = Some(Box::new(sink));
        self
    }

    /// Wrap the scheduler for use from several threads.
    pub fn into_shared(self) -> SharedScheduler<W> {
        Arc::new(Mutex::new(self))
    }

    /// Pool by id.
    #[must_use]
    pub fn pool(&self, id: PoolId) -> Option<&Pool<W>> {
        self.pools.get(&id)
    }

    /// All pools in id order.
    pub fn pools(&self) -> impl Iterator<Item = &Pool<W>> {
        self.pools.values()
    }

    /// Pool types with at least one pool.
    pub fn pool_types(&self) -> impl Iterator<Item = PoolType> + '_ {
        self.index.pool_types()
    }

    /// Pool type index.
    #[must_use]
    pub const fn index(&self) -> &PoolTypeIndex {
        &self.index
    }

    /// User record, if the user has submitted or been bound.
    #[must_use]
    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.get(user_id)
    }

    /// Snapshot of every pool in id order.
    pub fn snapshot(&self) -> Vec<PoolSnapshot> {
        self.pools.values().map(Pool::snapshot).collect()
    }

    /// Whether [`SchedulerState::terminate`] has been called.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Tracked tasks that have not finished.
    #[must_use]
    pub fn outstanding_tasks(&self) -> usize {
        self.tracked
            .iter()
            .filter(|t| !t.future.is_terminal())
            .count()
    }

    /// Best pool of `pool_type` right now, by the least-utilized ladder.
    ///
    /// # Errors
    ///
    /// `SchedulerError::UnknownPoolType` if no pool of that type exists.
    pub fn least_utilized_pool(&self, pool_type: PoolType) -> Result<PoolId, SchedulerError> {
        self.select_pool(pool_type, None)
    }

    fn select_pool(&self, pool_type: PoolType, exclude_user: Option<&str>) -> Result<PoolId, SchedulerError> {
        self.index
            .pools_of(pool_type)
            .filter_map(|id| self.pools.get(&id))
            .map(|pool| (pool.load(exclude_user), pool.id()))
            .min_by(|(a, a_id), (b, b_id)| a.preference(b).then_with(|| a_id.cmp(b_id)))
            .map(|(_, id)| id)
            .ok_or(SchedulerError::UnknownPoolType(pool_type))
    }

    fn ensure_running(&self) -> Result<(), SchedulerError> {
        if self.terminated {
            return Err(SchedulerError::Terminated);
        }
        Ok(())
    }

    /// Return the user's pool for `pool_type`, registering the user or
    /// rebalancing an idle binding as needed.
    ///
    /// A new user is bound across every pool type at once. An existing binding
    /// moves only while the user has no active task of that type.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::Terminated` after termination
    /// - `SchedulerError::UnknownPoolType` if no pool of that type exists;
    ///   the user table is left untouched
    pub fn ensure_pool(&mut self, user_id: &str, pool_type: PoolType) -> Result<PoolId, SchedulerError> {
        self.ensure_running()?;
        if !self.index.contains(pool_type) {
            return Err(SchedulerError::UnknownPoolType(pool_type));
        }
        if !self.users.contains_key(user_id) {
            self.register_user(user_id)?;
        }

        let (current, idle) = match self.users.get(user_id) {
            Some(user) => (user.binding(pool_type), user.is_idle(pool_type)),
            None => return Err(SchedulerError::UnknownUser(user_id.to_string())),
        };

        match current {
            Some(current) if !idle => Ok(current),
            _ => {
                let best = self.select_pool(pool_type, Some(user_id))?;
                if current != Some(best) {
                    self.bind(user_id, pool_type, best);
                }
                Ok(best)
            }
        }
    }

    fn register_user(&mut self, user_id: &str) -> Result<(), SchedulerError> {
        self.users.insert(user_id.to_string(), User::new(user_id));
        info!(user_id = user_id, "User registered");
        self.record(AuditAction::Register, Some(user_id), None, None, None);

        let pool_types: Vec<PoolType> = self.index.pool_types().collect();
        for pool_type in pool_types {
            let target = self.select_pool(pool_type, Some(user_id))?;
            self.bind(user_id, pool_type, target);
        }
        Ok(())
    }

    fn bind(&mut self, user_id: &str, pool_type: PoolType, target: PoolId) {
        let Some(user) = self.users.get_mut(user_id) else {
            return;
        };
        let previous = user.bind(pool_type, target);
        if previous == Some(target) {
            return;
        }
        if let Some(prev) = previous.and_then(|id| self.pools.get_mut(&id)) {
            prev.detach(user_id);
        }
        if let Some(pool) = self.pools.get_mut(&target) {
            pool.attach(user_id);
        }

        match previous {
            Some(from) => {
                info!(user_id = user_id, pool_type = %pool_type, from = %from, to = %target, "Idle user rebound");
                self.record(
                    AuditAction::Rebind,
                    Some(user_id),
                    Some(pool_type),
                    Some(target),
                    Some(format!("from {from}")),
                );
            }
            None => {
                debug!(user_id = user_id, pool_type = %pool_type, pool_id = %target, "User bound");
                self.record(AuditAction::Bind, Some(user_id), Some(pool_type), Some(target), None);
            }
        }
    }

    fn record(
        &mut self,
        action: AuditAction,
        user_id: Option<&str>,
        pool_type: Option<PoolType>,
        pool_id: Option<PoolId>,
        detail: Option<String>,
    ) {
        if let Some(sink) = self.audit.as_mut() {
            sink.record(build_audit_event(action, user_id, pool_type, pool_id, detail));
        }
    }

    /// Submit one task.
    ///
    /// # Errors
    ///
    /// Same as [`SchedulerState::submit_batch`].
    pub fn submit(&mut self, task: Task<W::Payload>) -> Result<TaskHandle<W::Output>, SchedulerError> {
        self.submit_batch(vec![task])?
            .pop()
            .ok_or(SchedulerError::EmptyBatch)
    }

    /// Submit tasks that share one user and one pool type to that user's pool
    /// in a single hand-off. Handles come back in submission order.
    ///
    /// # Errors
    ///
    /// - `EmptyBatch`, `MixedUsers`, `MixedPoolTypes` on contract violations
    /// - any error of [`SchedulerState::ensure_pool`]
    /// - `SchedulerError::Pool` if the pool rejects the batch (nothing is queued)
    pub fn submit_batch(
        &mut self,
        tasks: Vec<Task<W::Payload>>,
    ) -> Result<Vec<TaskHandle<W::Output>>, SchedulerError> {
        self.ensure_running()?;
        let (user_id, pool_type) = same_pool_owner(&tasks)?;
        let pool_id = self.ensure_pool(&user_id, pool_type)?;
        self.dispatch(&user_id, pool_type, pool_id, tasks)
    }

    /// Submit one user's tasks spanning several pool types. Every type is
    /// resolved before anything is queued; handles come back in submission order.
    ///
    /// # Errors
    ///
    /// - `EmptyBatch`, `MixedUsers` on contract violations
    /// - `UnknownPoolType` for any unconfigured type, before any side effect
    /// - `SchedulerError::Pool(PoolError::QueueFull)` if any pool cannot take its
    ///   sub-batch; checked for every pool before anything is queued
    pub fn submit_multi_pool_batch(
        &mut self,
        tasks: Vec<Task<W::Payload>>,
    ) -> Result<Vec<TaskHandle<W::Output>>, SchedulerError> {
        self.ensure_running()?;
        let user_id = single_owner(&tasks)?;

        let total = tasks.len();
        let mut groups: BTreeMap<PoolType, Vec<(usize, Task<W::Payload>)>> = BTreeMap::new();
        for (position, task) in tasks.into_iter().enumerate() {
            groups.entry(task.pool_type()).or_default().push((position, task));
        }

        if let Some(&missing) = groups.keys().find(|t| !self.index.contains(**t)) {
            return Err(SchedulerError::UnknownPoolType(missing));
        }
        let mut targets = Vec::with_capacity(groups.len());
        for &pool_type in groups.keys() {
            targets.push(self.ensure_pool(&user_id, pool_type)?);
        }
        for ((pool_type, group), pool_id) in groups.iter().zip(&targets) {
            let accepts = self
                .pools
                .get(pool_id)
                .is_some_and(|pool| pool.primitive().can_accept(group.len()));
            if !accepts {
                warn!(user_id = %user_id, pool_type = %pool_type, pool_id = %pool_id, count = group.len(), "Pool cannot take sub-batch, nothing submitted");
                return Err(SchedulerError::Pool(PoolError::QueueFull));
            }
        }

        let mut slots: Vec<Option<TaskHandle<W::Output>>> = (0..total).map(|_| None).collect();
        for ((pool_type, group), pool_id) in groups.into_iter().zip(targets) {
            let (positions, batch): (Vec<usize>, Vec<Task<W::Payload>>) = group.into_iter().unzip();
            let handles = self.dispatch(&user_id, pool_type, pool_id, batch)?;
            for (position, handle) in positions.into_iter().zip(handles) {
                slots[position] = Some(handle);
            }
        }
        Ok(slots.into_iter().flatten().collect())
    }

    fn dispatch(
        &mut self,
        user_id: &str,
        pool_type: PoolType,
        pool_id: PoolId,
        tasks: Vec<Task<W::Payload>>,
    ) -> Result<Vec<TaskHandle<W::Output>>, SchedulerError> {
        self.tracked.retain(|t| !t.future.is_terminal());

        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| SchedulerError::UnknownUser(user_id.to_string()))?;
        let pool = self
            .pools
            .get(&pool_id)
            .ok_or(SchedulerError::UnknownPoolType(pool_type))?;

        let created_at_ms = now_ms();
        let jobs: Vec<WorkerJob<W::Payload>> = tasks
            .into_iter()
            .map(|task| {
                let meta = TaskMetadata {
                    id: TaskId::new(),
                    user_id: user_id.to_string(),
                    pool_type,
                    pool_id,
                    cost: task.cost(),
                    created_at_ms,
                };
                WorkerJob::new(meta, task.into_payload()).with_guard(user.track(pool_type))
            })
            .collect();
        let count = jobs.len();

        let handles = pool.primitive().submit_batch(jobs).map_err(|e| {
            warn!(user_id = user_id, pool_id = %pool_id, count = count, error = %e, "Pool rejected batch");
            SchedulerError::Pool(e)
        })?;

        self.tracked.extend(handles.iter().map(|(_, future)| TrackedTask {
            user_id: user_id.to_string(),
            future: future.clone(),
        }));
        debug!(user_id = user_id, pool_type = %pool_type, pool_id = %pool_id, count = count, "Tasks submitted");
        self.record(
            AuditAction::Submit,
            Some(user_id),
            Some(pool_type),
            Some(pool_id),
            Some(format!("{count} task(s)")),
        );
        Ok(handles)
    }

    fn take_tracked(&mut self, user_id: Option<&str>) -> Vec<TrackedTask<W::Output>> {
        let (selected, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tracked)
            .into_iter()
            .partition(|t| user_id.is_none_or(|u| t.user_id == u));
        self.tracked = rest;
        selected
    }

    /// Block until every tracked task has finished.
    pub fn wait_all(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        for task in self.take_tracked(None) {
            report.record(task.future.join());
        }
        report
    }

    /// Block until every task submitted by `user_id` has finished.
    pub fn wait_all_for_user(&mut self, user_id: &str) -> DrainReport {
        let mut report = DrainReport::default();
        for task in self.take_tracked(Some(user_id)) {
            report.record(task.future.join());
        }
        report
    }

    /// Await every tracked task.
    pub async fn wait_all_async(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        for task in self.take_tracked(None) {
            report.record(task.future.join_async().await);
        }
        report
    }

    /// Await every task submitted by `user_id`.
    pub async fn wait_all_for_user_async(&mut self, user_id: &str) -> DrainReport {
        let mut report = DrainReport::default();
        for task in self.take_tracked(Some(user_id)) {
            report.record(task.future.join_async().await);
        }
        report
    }

    /// Stop accepting work, drain every outstanding task, then release all pools.
    ///
    /// Calling it again is a no-op returning an empty report.
    pub fn terminate(&mut self) -> DrainReport {
        if self.terminated {
            debug!("Scheduler already terminated");
            return DrainReport::default();
        }
        self.terminated = true;
        info!(outstanding = self.outstanding_tasks(), "Terminating scheduler, draining outstanding tasks");

        let report = self.wait_all();
        for pool in self.pools.values() {
            pool.primitive().terminate();
        }

        self.record(
            AuditAction::Terminate,
            None,
            None,
            None,
            Some(format!("resolved={} failed={}", report.resolved, report.failed)),
        );
        info!(resolved = report.resolved, failed = report.failed, pools = self.pools.len(), "Scheduler terminated");
        report
    }
}

fn same_pool_owner<P>(tasks: &[Task<P>]) -> Result<(String, PoolType), SchedulerError> {
    let first = tasks.first().ok_or(SchedulerError::EmptyBatch)?;
    for task in &tasks[1..] {
        if task.user_id() != first.user_id() {
            return Err(SchedulerError::MixedUsers {
                expected: first.user_id().to_string(),
                found: task.user_id().to_string(),
            });
        }
        if task.pool_type() != first.pool_type() {
            return Err(SchedulerError::MixedPoolTypes {
                expected: first.pool_type(),
                found: task.pool_type(),
            });
        }
    }
    Ok((first.user_id().to_string(), first.pool_type()))
}

fn single_owner<P>(tasks: &[Task<P>]) -> Result<String, SchedulerError> {
    let first = tasks.first().ok_or(SchedulerError::EmptyBatch)?;
    if let Some(other) = tasks.iter().find(|t| t.user_id() != first.user_id()) {
        return Err(SchedulerError::MixedUsers {
            expected: first.user_id().to_string(),
            found: other.user_id().to_string(),
        });
    }
    Ok(first.user_id().to_string())
}
