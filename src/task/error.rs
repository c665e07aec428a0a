//! Task Error Types
//!
//! Rejection and abortion are distinct failure kinds everywhere: in the
//! callback surface (`TaskFailure`) and in the future adapter (`TaskError`).

use thiserror::Error;

/// How a task failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum FailureKind {
    #[strum(serialize = "reject")]
    Reject,
    #[strum(serialize = "abort")]
    Abort,
}

/// Tagged failure union delivered to `wait` failure callbacks
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFailure<E> {
    pub kind: FailureKind,
    pub reason: E,
}

impl<E> TaskFailure<E> {
    pub fn reject(reason: E) -> Self {
        Self {
            kind: FailureKind::Reject,
            reason,
        }
    }

    pub fn abort(reason: E) -> Self {
        Self {
            kind: FailureKind::Abort,
            reason,
        }
    }

    pub fn into_error(self) -> TaskError<E> {
        match self.kind {
            FailureKind::Reject => TaskError::Rejected(self.reason),
            FailureKind::Abort => TaskError::Aborted(self.reason),
        }
    }
}

/// Error produced by the future adapter, wrapping the original reason
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError<E> {
    #[error("task rejected: {0:?}")]
    Rejected(E),

    #[error("task aborted: {0:?}")]
    Aborted(E),
}

impl<E> TaskError<E> {
    /// The original failure reason
    pub fn reason(&self) -> &E {
        match self {
            TaskError::Rejected(reason) | TaskError::Aborted(reason) => reason,
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, TaskError::Aborted(_))
    }
}

/// `race` has no meaningful result for an empty input set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("race requires at least one input task")]
pub struct EmptyRaceError;

/// Result type alias for the future adapter
pub type TaskResult<T, E> = Result<T, TaskError<E>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::Reject.to_string(), "reject");
        assert_eq!(FailureKind::Abort.to_string(), "abort");
    }

    #[test]
    fn test_failure_into_error_preserves_kind() {
        let rejected = TaskFailure::reject("bad").into_error();
        assert_eq!(rejected, TaskError::Rejected("bad"));
        assert!(!rejected.is_abort());

        let aborted = TaskFailure::abort("stop").into_error();
        assert_eq!(aborted, TaskError::Aborted("stop"));
        assert!(aborted.is_abort());
        assert_eq!(*aborted.reason(), "stop");
    }
}
