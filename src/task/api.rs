//! Public API for the task system
//!
//! This module provides the complete public API for the task primitive.
//! External modules should import from here rather than directly from
//! internal modules.

pub use crate::task::combinators::SettledResult;
pub use crate::task::core::{Task, TaskFuture, TaskState};
pub use crate::task::error::{EmptyRaceError, FailureKind, TaskError, TaskFailure, TaskResult};
pub use crate::task::helpers::{abort_task, aborted_task, rejected_task, resolved_task};
