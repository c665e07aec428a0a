//! Generic Cancellable Task Primitive
//!
//! Tri-state async primitive used for engine calls and cross-plugin
//! coordination: a task is pending until it is resolved, rejected or
//! aborted, with callback registration as the primitive operation and a
//! derived, memoized future adapter. Combinators compose task collections
//! (`all`, `all_settled`, `race`, `with_progress`).

// Internal modules - all access should go through api module
pub(crate) mod combinators;
pub(crate) mod core;
pub(crate) mod error;
pub(crate) mod helpers;

// Public API module - the only public interface for the task system
pub mod api;
