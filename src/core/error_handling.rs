//! Generic error handling utilities
//!
//! Provides unified error handling that can work across different error types
//! while maintaining domain-specific error logging patterns.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// User-actionable errors (configuration mistakes, invalid manifests) should
/// show their specific message directly. System errors (engine failures,
/// lifecycle faults) should show generic context with debug detail.
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)`; when it returns `false`, `user_message()` must return
/// `None`.
pub trait ContextualError: std::error::Error {
    /// Returns true if this error carries a specific, user-actionable message
    /// that should be displayed directly
    fn is_user_actionable(&self) -> bool;

    /// Returns the specific user message if this is a user-actionable error
    fn user_message(&self) -> Option<&str>;
}

/// Log an error with appropriate detail level based on error specificity
///
/// User-actionable errors keep their specific message; system errors are
/// reported with operation context plus debug detail.
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    if error.is_user_actionable() {
        if let Some(user_msg) = error.user_message() {
            log::error!("FATAL: {}", user_msg);
        } else {
            log::error!("FATAL: {}", operation_context);
        }
    } else {
        log::error!("FATAL: {}: {}", operation_context, error);
        log::debug!("{} failure detail: {:?}", operation_context, error);
    }
}
