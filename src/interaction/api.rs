//! Public API for the interaction manager
//!
//! This module provides the complete public API for the interaction
//! manager. External modules should import from here rather than directly
//! from internal modules.

pub use crate::interaction::cursor::CursorClaim;
pub use crate::interaction::error::{InteractionError, InteractionResult};
pub use crate::interaction::handlers::{
    EventScope, HandlerToken, MergedHandlers, ModeScope, PointerCallback, PointerEventData,
    PointerEventHandlers,
};
pub use crate::interaction::plugin::{
    InteractionManagerPlugin, InteractionMode, ModeChange, RegisterHandlersOptions,
};
pub use crate::interaction::state::{
    interaction_reducer, ExclusionRules, InteractionState, ACTIVATE_MODE, SET_CURSOR,
    SET_EXCLUSION_RULES, SET_PAUSED,
};
