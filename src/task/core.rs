//! Task Core Implementation
//!
//! The settlement machine: a task starts pending and transitions exactly
//! once into resolved, rejected or aborted. Callbacks queue while pending
//! and fire exactly once; registrations after settlement are answered
//! synchronously. Callback panics are contained so sibling callbacks and
//! task state stay intact.

use crate::core::sync::lock_recover;
use crate::task::error::{FailureKind, TaskError, TaskFailure};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

type ResolveCallback<T> = Box<dyn FnOnce(T) + Send>;
type FailureCallback<E> = Box<dyn FnOnce(TaskFailure<E>) + Send>;
type ProgressCallback<P> = Arc<dyn Fn(P) + Send + Sync>;

/// Memoized shared future returned by [`Task::to_future`]
pub type TaskFuture<T, E> = Shared<BoxFuture<'static, Result<T, TaskError<E>>>>;

/// Settlement state of a task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState<T, E> {
    Pending,
    Resolved(T),
    Rejected(E),
    Aborted(E),
}

struct TaskInner<T, E, P> {
    state: TaskState<T, E>,
    resolve_callbacks: Vec<ResolveCallback<T>>,
    failure_callbacks: Vec<FailureCallback<E>>,
    progress_callbacks: Vec<ProgressCallback<P>>,
    future: Option<TaskFuture<T, E>>,
}

/// Cancellable tri-state async primitive
///
/// Handles are cheap clones sharing one settlement state. `resolve`,
/// `reject` and `abort` are no-ops once the task has settled.
pub struct Task<T, E = String, P = ()> {
    inner: Arc<Mutex<TaskInner<T, E, P>>>,
}

impl<T, E, P> Clone for Task<T, E, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E, P> Default for Task<T, E, P>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    P: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E, P> Task<T, E, P>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    P: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TaskInner {
                state: TaskState::Pending,
                resolve_callbacks: Vec::new(),
                failure_callbacks: Vec::new(),
                progress_callbacks: Vec::new(),
                future: None,
            })),
        }
    }

    /// Current settlement state (cloned)
    pub fn state(&self) -> TaskState<T, E> {
        lock_recover(&self.inner).state.clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(lock_recover(&self.inner).state, TaskState::Pending)
    }

    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// Settle the task successfully; no-op after settlement
    pub fn resolve(&self, value: T) {
        let callbacks = {
            let mut inner = lock_recover(&self.inner);
            if !matches!(inner.state, TaskState::Pending) {
                return;
            }
            inner.state = TaskState::Resolved(value.clone());
            inner.failure_callbacks.clear();
            inner.progress_callbacks.clear();
            std::mem::take(&mut inner.resolve_callbacks)
        };
        for callback in callbacks {
            let value = value.clone();
            let _ = catch_unwind(AssertUnwindSafe(move || callback(value)));
        }
    }

    /// Settle the task as rejected; no-op after settlement
    pub fn reject(&self, reason: E) {
        self.settle_failed(FailureKind::Reject, reason);
    }

    /// Settle the task as aborted; no-op after settlement
    ///
    /// Abortion is a cooperative signal: pending callbacks are notified but
    /// in-flight external work is not interrupted unless it checks for the
    /// abort itself.
    pub fn abort(&self, reason: E) {
        self.settle_failed(FailureKind::Abort, reason);
    }

    fn settle_failed(&self, kind: FailureKind, reason: E) {
        let callbacks = {
            let mut inner = lock_recover(&self.inner);
            if !matches!(inner.state, TaskState::Pending) {
                return;
            }
            inner.state = match kind {
                FailureKind::Reject => TaskState::Rejected(reason.clone()),
                FailureKind::Abort => TaskState::Aborted(reason.clone()),
            };
            inner.resolve_callbacks.clear();
            inner.progress_callbacks.clear();
            std::mem::take(&mut inner.failure_callbacks)
        };
        for callback in callbacks {
            let failure = TaskFailure {
                kind,
                reason: reason.clone(),
            };
            let _ = catch_unwind(AssertUnwindSafe(move || callback(failure)));
        }
    }

    /// Register settlement callbacks
    ///
    /// While pending both callbacks queue; once settled the matching side is
    /// invoked synchronously. Callback lists are cleared when they fire, so
    /// a callback that re-enters `wait` on an already-settled task is
    /// answered immediately without re-enqueueing.
    pub fn wait(
        &self,
        on_resolved: impl FnOnce(T) + Send + 'static,
        on_failed: impl FnOnce(TaskFailure<E>) + Send + 'static,
    ) {
        enum Immediate<T, E> {
            Queued,
            Resolved(T),
            Failed(TaskFailure<E>),
        }

        let mut on_resolved = Some(on_resolved);
        let mut on_failed = Some(on_failed);

        let immediate = {
            let mut inner = lock_recover(&self.inner);
            match &inner.state {
                TaskState::Pending => {
                    inner
                        .resolve_callbacks
                        .push(Box::new(on_resolved.take().unwrap()));
                    inner
                        .failure_callbacks
                        .push(Box::new(on_failed.take().unwrap()));
                    Immediate::Queued
                }
                TaskState::Resolved(value) => Immediate::Resolved(value.clone()),
                TaskState::Rejected(reason) => {
                    Immediate::Failed(TaskFailure::reject(reason.clone()))
                }
                TaskState::Aborted(reason) => Immediate::Failed(TaskFailure::abort(reason.clone())),
            }
        };

        match immediate {
            Immediate::Queued => {}
            Immediate::Resolved(value) => {
                let on_resolved = on_resolved.take().unwrap();
                let _ = catch_unwind(AssertUnwindSafe(move || on_resolved(value)));
            }
            Immediate::Failed(failure) => {
                let on_failed = on_failed.take().unwrap();
                let _ = catch_unwind(AssertUnwindSafe(move || on_failed(failure)));
            }
        }
    }

    /// Register a progress callback; dropped once the task settles
    pub fn on_progress(&self, callback: impl Fn(P) + Send + Sync + 'static) {
        let mut inner = lock_recover(&self.inner);
        if matches!(inner.state, TaskState::Pending) {
            inner.progress_callbacks.push(Arc::new(callback));
        }
    }

    /// Notify progress callbacks; orthogonal to settlement, may fire any
    /// number of times while pending
    pub fn progress(&self, value: P) {
        let callbacks: Vec<ProgressCallback<P>> = {
            let inner = lock_recover(&self.inner);
            if !matches!(inner.state, TaskState::Pending) {
                return;
            }
            inner.progress_callbacks.clone()
        };
        for callback in callbacks {
            let value = value.clone();
            let _ = catch_unwind(AssertUnwindSafe(move || (*callback)(value)));
        }
    }

    /// Memoized future adapter
    ///
    /// Rejection and abortion map to the two distinct [`TaskError`] kinds.
    /// Repeated calls return the same shared future.
    pub fn to_future(&self) -> TaskFuture<T, E> {
        let mut inner = lock_recover(&self.inner);
        if let Some(existing) = &inner.future {
            return existing.clone();
        }

        let fut: BoxFuture<'static, Result<T, TaskError<E>>> = match &inner.state {
            TaskState::Pending => {
                let (tx, rx) = futures::channel::oneshot::channel::<Result<T, TaskError<E>>>();
                let tx = Arc::new(Mutex::new(Some(tx)));
                let tx_resolve = tx.clone();
                inner.resolve_callbacks.push(Box::new(move |value| {
                    if let Some(tx) = lock_recover(&tx_resolve).take() {
                        let _ = tx.send(Ok(value));
                    }
                }));
                inner.failure_callbacks.push(Box::new(move |failure| {
                    if let Some(tx) = lock_recover(&tx).take() {
                        let _ = tx.send(Err(failure.into_error()));
                    }
                }));
                async move {
                    match rx.await {
                        Ok(result) => result,
                        // every handle dropped while pending: never settles
                        Err(_) => futures::future::pending().await,
                    }
                }
                .boxed()
            }
            TaskState::Resolved(value) => futures::future::ready(Ok(value.clone())).boxed(),
            TaskState::Rejected(reason) => {
                futures::future::ready(Err(TaskError::Rejected(reason.clone()))).boxed()
            }
            TaskState::Aborted(reason) => {
                futures::future::ready(Err(TaskError::Aborted(reason.clone()))).boxed()
            }
        };

        let shared = fut.shared();
        inner.future = Some(shared.clone());
        shared
    }
}

impl<T, E, P> std::fmt::Debug for Task<T, E, P>
where
    T: std::fmt::Debug,
    E: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock_recover(&self.inner);
        f.debug_struct("Task")
            .field("state", &inner.state)
            .field("resolve_callbacks", &inner.resolve_callbacks.len())
            .field("failure_callbacks", &inner.failure_callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_task_starts_pending() {
        let task: Task<i32, String> = Task::new();
        assert!(task.is_pending());
        assert_eq!(task.state(), TaskState::Pending);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let task: Task<i32, String> = Task::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        task.wait(
            move |value| {
                assert_eq!(value, 1);
                counter.fetch_add(1, Ordering::SeqCst);
            },
            |_| panic!("should not fail"),
        );

        task.resolve(1);
        task.resolve(2);
        task.reject("late".to_string());

        assert_eq!(task.state(), TaskState::Resolved(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reject_and_abort_are_distinct() {
        let rejected: Task<i32, String> = Task::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        rejected.wait(
            |_| panic!("should not resolve"),
            move |failure| {
                *lock_recover(&sink) = Some(failure);
            },
        );
        rejected.reject("bad input".to_string());
        let failure = lock_recover(&seen).clone().unwrap();
        assert_eq!(failure.kind, FailureKind::Reject);
        assert_eq!(failure.reason, "bad input");

        let aborted: Task<i32, String> = Task::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        aborted.wait(
            |_| panic!("should not resolve"),
            move |failure| {
                *lock_recover(&sink) = Some(failure);
            },
        );
        aborted.abort("cancelled".to_string());
        let failure = lock_recover(&seen).clone().unwrap();
        assert_eq!(failure.kind, FailureKind::Abort);
        assert_eq!(failure.reason, "cancelled");
    }

    #[test]
    fn test_wait_after_settlement_is_synchronous() {
        let task: Task<i32, String> = Task::new();
        task.resolve(42);

        let observed = Arc::new(AtomicUsize::new(0));
        let sink = observed.clone();
        task.wait(
            move |value| sink.store(value as usize, Ordering::SeqCst),
            |_| panic!("should not fail"),
        );
        assert_eq!(observed.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_callback_panic_is_contained() {
        let task: Task<i32, String> = Task::new();
        let survivor = Arc::new(AtomicUsize::new(0));

        task.wait(|_| panic!("broken subscriber"), |_| {});
        let sink = survivor.clone();
        task.wait(
            move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            },
            |_| {},
        );

        task.resolve(5);

        assert_eq!(survivor.load(Ordering::SeqCst), 1);
        assert_eq!(task.state(), TaskState::Resolved(5));

        // state machine still answers late registrations
        let late = Arc::new(AtomicUsize::new(0));
        let sink = late.clone();
        task.wait(
            move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            },
            |_| {},
        );
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_wait_from_callback() {
        let task: Task<i32, String> = Task::new();
        let inner_value = Arc::new(AtomicUsize::new(0));

        let handle = task.clone();
        let sink = inner_value.clone();
        task.wait(
            move |_| {
                // by the time callbacks fire the task has settled, so this
                // nested wait is answered synchronously
                handle.wait(
                    move |value| sink.store(value as usize, Ordering::SeqCst),
                    |_| {},
                );
            },
            |_| {},
        );

        task.resolve(9);
        assert_eq!(inner_value.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn test_progress_fires_until_settlement() {
        let task: Task<i32, String, u32> = Task::new();
        let total = Arc::new(AtomicUsize::new(0));

        let sink = total.clone();
        task.on_progress(move |step| {
            sink.fetch_add(step as usize, Ordering::SeqCst);
        });

        task.progress(1);
        task.progress(2);
        task.resolve(0);
        task.progress(10);

        assert_eq!(total.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_to_future_resolution() {
        let task: Task<i32, String> = Task::new();
        let future = task.to_future();
        task.resolve(7);
        assert_eq!(future.await, Ok(7));
    }

    #[tokio::test]
    async fn test_to_future_distinguishes_failure_kinds() {
        let rejected: Task<i32, String> = Task::new();
        rejected.reject("nope".to_string());
        assert_eq!(
            rejected.to_future().await,
            Err(TaskError::Rejected("nope".to_string()))
        );

        let aborted: Task<i32, String> = Task::new();
        aborted.abort("stop".to_string());
        assert_eq!(
            aborted.to_future().await,
            Err(TaskError::Aborted("stop".to_string()))
        );
    }

    #[tokio::test]
    async fn test_to_future_is_memoized() {
        let task: Task<i32, String> = Task::new();
        let first = task.to_future();
        let second = task.to_future();
        task.resolve(3);
        assert_eq!(first.await, Ok(3));
        assert_eq!(second.await, Ok(3));
    }
}
