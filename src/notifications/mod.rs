//! Notification Primitives
//!
//! Callback-based pub/sub used for cross-plugin signalling. Delivery is
//! synchronous and in subscription order; listener lists are snapshotted per
//! emission so subscribing or unsubscribing from inside a firing callback is
//! safe. The behavior variant retains its last value and supports derived
//! sub-streams plus debounce/throttle-wrapped subscriptions.

// Internal modules - all access should go through api module
pub(crate) mod behavior;
pub(crate) mod emitter;

// Public API module - the only public interface for the notification system
pub mod api;
