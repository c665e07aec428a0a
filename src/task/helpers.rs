//! Task Construction Helpers
//!
//! Pre-settled task constructors for collaborators that answer
//! synchronously, plus the legacy abort helper.

use crate::task::core::Task;

/// Task already settled with a value
pub fn resolved_task<T, E, P>(value: T) -> Task<T, E, P>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    P: Clone + Send + 'static,
{
    let task = Task::new();
    task.resolve(value);
    task
}

/// Task already settled as rejected
pub fn rejected_task<T, E, P>(reason: E) -> Task<T, E, P>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    P: Clone + Send + 'static,
{
    let task = Task::new();
    task.reject(reason);
    task
}

/// Task already settled as aborted
pub fn aborted_task<T, E, P>(reason: E) -> Task<T, E, P>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    P: Clone + Send + 'static,
{
    let task = Task::new();
    task.abort(reason);
    task
}

/// Settle a task as failed on behalf of an abort request
///
/// Delivers the failure through the reject channel, so waiters observe a
/// rejection rather than an abort. Callers that need an abort-tagged
/// failure must call [`Task::abort`] directly.
pub fn abort_task<T, E, P>(task: &Task<T, E, P>, reason: E)
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    P: Clone + Send + 'static,
{
    task.reject(reason);
}
