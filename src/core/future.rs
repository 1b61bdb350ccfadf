//! One-shot completion cells linking a worker to the callers waiting on its task.
//!
//! A [`TaskPromise`] is held by whoever executes the task; every clone of the
//! matching [`TaskFuture`] observes the same terminal state. Waiting is supported
//! both from blocking code (parking_lot `Condvar`) and from async code
//! (tokio `Notify`), without polling.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Notify;

use crate::core::task::TaskId;

/// Why a task did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskFailure {
    /// The executor reported an error.
    #[error("task execution failed: {0}")]
    Execution(String),
    /// The executor panicked; the worker thread survived.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The task was dropped before it ran (e.g. its pool shut down).
    #[error("task abandoned before completion")]
    Abandoned,
}

impl TaskFailure {
    /// Build an execution failure from any displayable error.
    pub fn execution(err: impl fmt::Display) -> Self {
        Self::Execution(err.to_string())
    }
}

/// Observable state of a task future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FutureStatus {
    /// Not yet finished.
    Pending,
    /// Finished with a result.
    Resolved,
    /// Finished with a failure.
    Failed,
}

impl FutureStatus {
    /// Whether the state is final.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

enum Slot<R> {
    Pending,
    Resolved(R),
    Failed(TaskFailure),
}

impl<R> Slot<R> {
    const fn status(&self) -> FutureStatus {
        match self {
            Self::Pending => FutureStatus::Pending,
            Self::Resolved(_) => FutureStatus::Resolved,
            Self::Failed(_) => FutureStatus::Failed,
        }
    }

    fn outcome(&self) -> Option<Result<R, TaskFailure>>
    where
        R: Clone,
    {
        match self {
            Self::Pending => None,
            Self::Resolved(r) => Some(Ok(r.clone())),
            Self::Failed(e) => Some(Err(e.clone())),
        }
    }
}

struct Shared<R> {
    slot: Mutex<Slot<R>>,
    ready: Condvar,
    notify: Notify,
}

/// Create a linked promise/future pair for the given task.
#[must_use]
pub fn task_channel<R>(id: TaskId) -> (TaskPromise<R>, TaskFuture<R>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Pending),
        ready: Condvar::new(),
        notify: Notify::new(),
    });
    (
        TaskPromise {
            shared: Some(Arc::clone(&shared)),
        },
        TaskFuture { id, shared },
    )
}

/// Completing side of a task. Dropping it unresolved fails the task with
/// [`TaskFailure::Abandoned`].
pub struct TaskPromise<R> {
    shared: Option<Arc<Shared<R>>>,
}

impl<R> TaskPromise<R> {
    /// Record the task outcome and wake every waiter.
    pub fn complete(mut self, outcome: Result<R, TaskFailure>) {
        self.settle(outcome);
    }

    fn settle(&mut self, outcome: Result<R, TaskFailure>) {
        let Some(shared) = self.shared.take() else {
            return;
        };
        {
            let mut slot = shared.slot.lock();
            if matches!(*slot, Slot::Pending) {
                *slot = match outcome {
                    Ok(r) => Slot::Resolved(r),
                    Err(e) => Slot::Failed(e),
                };
            }
        }
        shared.ready.notify_all();
        shared.notify.notify_waiters();
    }
}

impl<R> Drop for TaskPromise<R> {
    fn drop(&mut self) {
        self.settle(Err(TaskFailure::Abandoned));
    }
}

/// Handle to a task's eventual result. Cheap to clone; all clones share state.
pub struct TaskFuture<R> {
    id: TaskId,
    shared: Arc<Shared<R>>,
}

impl<R> Clone for TaskFuture<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R> fmt::Debug for TaskFuture<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFuture")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

impl<R> TaskFuture<R> {
    /// Identifier of the task this future belongs to.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Current state without blocking.
    #[must_use]
    pub fn status(&self) -> FutureStatus {
        self.shared.slot.lock().status()
    }

    /// Whether the task has finished.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Block until the task finishes and report how it ended.
    pub fn join(&self) -> FutureStatus {
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Pending) {
            self.shared.ready.wait(&mut slot);
        }
        slot.status()
    }

    /// Block until the task finishes or `timeout` elapses.
    pub fn join_timeout(&self, timeout: Duration) -> FutureStatus {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Pending) {
            if self.shared.ready.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        slot.status()
    }

    /// Wait asynchronously until the task finishes.
    pub async fn join_async(&self) -> FutureStatus {
        loop {
            // Registered before the check so a completion in between is not missed.
            let notified = self.shared.notify.notified();
            let status = self.status();
            if status.is_terminal() {
                return status;
            }
            notified.await;
        }
    }

    /// Result if the task has finished, without blocking.
    pub fn try_result(&self) -> Option<Result<R, TaskFailure>>
    where
        R: Clone,
    {
        self.shared.slot.lock().outcome()
    }

    /// Block until the task finishes and return its outcome.
    ///
    /// # Errors
    ///
    /// Returns the task's [`TaskFailure`] if it did not succeed.
    pub fn wait(&self) -> Result<R, TaskFailure>
    where
        R: Clone,
    {
        self.join();
        self.try_result().unwrap_or(Err(TaskFailure::Abandoned))
    }

    /// Block up to `timeout`; `None` if the task is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<R, TaskFailure>>
    where
        R: Clone,
    {
        self.join_timeout(timeout);
        self.try_result()
    }

    /// Await the task's outcome.
    ///
    /// # Errors
    ///
    /// Returns the task's [`TaskFailure`] if it did not succeed.
    pub async fn wait_async(&self) -> Result<R, TaskFailure>
    where
        R: Clone,
    {
        self.join_async().await;
        self.try_result().unwrap_or(Err(TaskFailure::Abandoned))
    }
}
