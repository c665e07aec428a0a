//! Public API for the notification system
//!
//! This module provides the complete public API for the notification
//! primitives. External modules should import from here rather than
//! directly from internal modules.

pub use crate::notifications::behavior::BehaviorEmitter;
pub use crate::notifications::emitter::{Emitter, SubscriptionId};
