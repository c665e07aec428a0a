//! Synchronization utilities for robust mutex handling
//!
//! The store, emitters and task primitives share state behind `Arc<Mutex<_>>`
//! handles whose public surfaces (dispatch, emit, settle) are infallible, so
//! a poisoned lock cannot be surfaced as an error. These helpers recover the
//! guard instead. Poisoning can only arise from a panicking subscriber
//! callback, and all callback invocation happens after the lock is released,
//! so a recovered guard never exposes half-written state.

use std::sync::{Mutex, MutexGuard};

/// Acquire a mutex, recovering the guard if the lock was poisoned
pub fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
