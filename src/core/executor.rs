//! Task execution trait.

use async_trait::async_trait;

use super::{TaskFailure, TaskMetadata};

/// Executes the caller-supplied business logic of a task on a worker thread.
///
/// The scheduler never inspects payloads or results; it only routes them.
/// Result types need no serialization, so they may carry channels or handles.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_pool_scheduler::core::{TaskFailure, TaskMetadata, WorkerExecutor};
///
/// #[derive(Clone)]
/// struct Resize;
///
/// #[async_trait]
/// impl WorkerExecutor<Vec<u8>, Vec<u8>> for Resize {
///     async fn execute(&self, image: Vec<u8>, _meta: TaskMetadata) -> Result<Vec<u8>, TaskFailure> {
///         shrink(&image).map_err(TaskFailure::execution)
///     }
/// }
/// ```
#[async_trait]
pub trait WorkerExecutor<P, R>: Send + Sync + Clone + 'static
where
    P: Send + 'static,
    R: Send + 'static,
{
    /// Execute a task payload.
    ///
    /// # Arguments
    ///
    /// * `payload` - The task payload to execute
    /// * `meta` - Scheduled metadata: task id, owning user, pool, cost
    ///
    /// # Errors
    ///
    /// A returned [`TaskFailure`] fails only this task's future; sibling tasks,
    /// the pool and the user's binding are unaffected.
    ///
    /// # Threading
    ///
    /// Called from a dedicated worker thread with its own single-threaded
    /// tokio runtime, so CPU-bound work does not stall the caller's runtime.
    async fn execute(&self, payload: P, meta: TaskMetadata) -> Result<R, TaskFailure>;
}
