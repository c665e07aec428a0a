//! Interaction Manager State Slice
//!
//! The dispatched half of the interaction manager: active mode, effective
//! cursor, pause flag and exclusion rules. Handler buckets and cursor
//! claims deliberately stay outside this slice.

use crate::store::api::Action;
use serde::{Deserialize, Serialize};

pub const ACTIVATE_MODE: &str = "interaction/activate-mode";
pub const SET_CURSOR: &str = "interaction/set-cursor";
pub const SET_PAUSED: &str = "interaction/set-paused";
pub const SET_EXCLUSION_RULES: &str = "interaction/set-exclusion-rules";

/// Markers excluding DOM subtrees from interaction handling
///
/// Elements (or their ancestors) bearing any of these class or attribute
/// markers never trigger interaction handlers; the DOM adapter reads these
/// through the normal state-subscription channel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExclusionRules {
    pub classes: Vec<String>,
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionState {
    pub active_mode: String,
    pub default_mode: String,
    pub cursor: String,
    pub paused: bool,
    pub exclusion_rules: ExclusionRules,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            active_mode: "default".to_string(),
            default_mode: "default".to_string(),
            cursor: "auto".to_string(),
            paused: false,
            exclusion_rules: ExclusionRules::default(),
        }
    }
}

pub fn interaction_reducer(state: &InteractionState, action: &Action) -> InteractionState {
    match action.kind() {
        ACTIVATE_MODE => InteractionState {
            active_mode: action
                .payload_field("mode")
                .and_then(|v| v.as_str())
                .unwrap_or(&state.active_mode)
                .to_string(),
            ..state.clone()
        },
        SET_CURSOR => InteractionState {
            cursor: action
                .payload_field("cursor")
                .and_then(|v| v.as_str())
                .unwrap_or(&state.cursor)
                .to_string(),
            ..state.clone()
        },
        SET_PAUSED => InteractionState {
            paused: action
                .payload_field("paused")
                .and_then(|v| v.as_bool())
                .unwrap_or(state.paused),
            ..state.clone()
        },
        SET_EXCLUSION_RULES => InteractionState {
            exclusion_rules: action
                .payload_field("rules")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_else(|| state.exclusion_rules.clone()),
            ..state.clone()
        },
        _ => state.clone(),
    }
}
