//! Public API for the store system
//!
//! This module provides the complete public API for the two-tier store.
//! External modules should import from here rather than directly from
//! internal modules.

pub use crate::notifications::emitter::SubscriptionId;
pub use crate::store::action::Action;
pub use crate::store::error::{StoreError, StoreResult};
pub use crate::store::manager::Store;
pub use crate::store::plugin_store::PluginStore;
pub use crate::store::state::{
    core_reducer, CoreState, GlobalState, Rotation, StateSlice, CLOSE_DOCUMENT,
    CORE_ACTION_KINDS, SET_DOCUMENT, SET_LOADING, SET_ROTATION, SET_SCALE,
};
