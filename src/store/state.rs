//! Core Viewer State
//!
//! The core slice owned exclusively by the core reducer, plus the
//! type-erased slice machinery and the combined global-state snapshot.

use crate::store::action::Action;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;

pub const SET_DOCUMENT: &str = "core/set-document";
pub const CLOSE_DOCUMENT: &str = "core/close-document";
pub const SET_SCALE: &str = "core/set-scale";
pub const SET_ROTATION: &str = "core/set-rotation";
pub const SET_LOADING: &str = "core/set-loading";

/// Action kinds the core reducer responds to
pub const CORE_ACTION_KINDS: &[&str] = &[
    SET_DOCUMENT,
    CLOSE_DOCUMENT,
    SET_SCALE,
    SET_ROTATION,
    SET_LOADING,
];

/// Page rotation in quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Rotation {
    #[default]
    Degree0,
    Degree90,
    Degree180,
    Degree270,
}

impl Rotation {
    pub fn from_quarter_turns(turns: u64) -> Self {
        match turns % 4 {
            1 => Rotation::Degree90,
            2 => Rotation::Degree180,
            3 => Rotation::Degree270,
            _ => Rotation::Degree0,
        }
    }
}

/// Core viewer state, owned exclusively by the core reducer
#[derive(Debug, Clone, PartialEq)]
pub struct CoreState {
    pub document_id: Option<String>,
    pub page_count: usize,
    pub scale: f64,
    pub rotation: Rotation,
    pub loading: bool,
}

impl Default for CoreState {
    fn default() -> Self {
        Self {
            document_id: None,
            page_count: 0,
            scale: 1.0,
            rotation: Rotation::Degree0,
            loading: false,
        }
    }
}

/// Core reducer: copy-on-write per touched field, passthrough otherwise
pub fn core_reducer(state: &CoreState, action: &Action) -> CoreState {
    match action.kind() {
        SET_DOCUMENT => CoreState {
            document_id: action
                .payload_field("id")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            page_count: action
                .payload_field("page_count")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as usize,
            loading: false,
            ..state.clone()
        },
        CLOSE_DOCUMENT => CoreState {
            document_id: None,
            page_count: 0,
            loading: false,
            ..state.clone()
        },
        SET_SCALE => {
            let scale = action
                .payload_field("scale")
                .and_then(|v| v.as_f64())
                .unwrap_or(state.scale);
            CoreState {
                scale: if scale > 0.0 { scale } else { state.scale },
                ..state.clone()
            }
        }
        SET_ROTATION => CoreState {
            rotation: action
                .payload_field("quarter_turns")
                .and_then(|v| v.as_u64())
                .map(Rotation::from_quarter_turns)
                .unwrap_or(state.rotation),
            ..state.clone()
        },
        SET_LOADING => CoreState {
            loading: action
                .payload_field("loading")
                .and_then(|v| v.as_bool())
                .unwrap_or(state.loading),
            ..state.clone()
        },
        _ => state.clone(),
    }
}

/// Type-erased plugin state slice
///
/// Every plugin slice type gets this for free: `Any + Clone + Send` is all
/// the store needs to snapshot and downcast.
pub trait StateSlice: Any + Send {
    fn clone_slice(&self) -> Box<dyn StateSlice>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Clone + Send> StateSlice for T {
    fn clone_slice(&self) -> Box<dyn StateSlice> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Clone for Box<dyn StateSlice> {
    fn clone(&self) -> Self {
        self.clone_slice()
    }
}

/// One-level-deep snapshot of the whole store
///
/// The core state and each slice are cloned at snapshot time; nested
/// structures inside a slice follow whatever copy-on-write discipline the
/// owning reducer applies.
#[derive(Clone)]
pub struct GlobalState {
    pub core: CoreState,
    plugins: HashMap<String, Box<dyn StateSlice>>,
}

impl GlobalState {
    pub(crate) fn new(core: CoreState, plugins: HashMap<String, Box<dyn StateSlice>>) -> Self {
        Self { core, plugins }
    }

    /// Typed view of one plugin slice
    pub fn plugin<T: Any>(&self, plugin_id: &str) -> Option<&T> {
        self.plugins
            .get(plugin_id)
            .and_then(|slice| slice.as_any().downcast_ref::<T>())
    }

    pub fn plugin_ids(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }
}

impl std::fmt::Debug for GlobalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalState")
            .field("core", &self.core)
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_reducer_set_document() {
        let state = CoreState::default();
        let next = core_reducer(
            &state,
            &Action::with_payload(
                SET_DOCUMENT,
                serde_json::json!({"id": "doc-1", "page_count": 24}),
            ),
        );

        assert_eq!(next.document_id.as_deref(), Some("doc-1"));
        assert_eq!(next.page_count, 24);
        assert!(!next.loading);
        // untouched fields carry over
        assert_eq!(next.scale, 1.0);
    }

    #[test]
    fn test_core_reducer_ignores_unknown_kind() {
        let state = CoreState {
            document_id: Some("doc-1".to_string()),
            page_count: 3,
            scale: 2.0,
            rotation: Rotation::Degree90,
            loading: true,
        };
        let next = core_reducer(&state, &Action::new("selection/select-all"));
        assert_eq!(next, state);
    }

    #[test]
    fn test_core_reducer_rejects_non_positive_scale() {
        let state = CoreState::default();
        let next = core_reducer(
            &state,
            &Action::with_payload(SET_SCALE, serde_json::json!({"scale": 0.0})),
        );
        assert_eq!(next.scale, 1.0);
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(Rotation::from_quarter_turns(0), Rotation::Degree0);
        assert_eq!(Rotation::from_quarter_turns(3), Rotation::Degree270);
        assert_eq!(Rotation::from_quarter_turns(5), Rotation::Degree90);
    }

    #[test]
    fn test_global_state_typed_slice_access() {
        #[derive(Debug, Clone, PartialEq)]
        struct ZoomState {
            level: f64,
        }

        let mut plugins: HashMap<String, Box<dyn StateSlice>> = HashMap::new();
        plugins.insert("zoom".to_string(), Box::new(ZoomState { level: 1.5 }));

        let state = GlobalState::new(CoreState::default(), plugins);
        assert_eq!(
            state.plugin::<ZoomState>("zoom"),
            Some(&ZoomState { level: 1.5 })
        );
        assert!(state.plugin::<ZoomState>("missing").is_none());
        // wrong type requested: the downcast answers None rather than lying
        assert!(state.plugin::<u32>("zoom").is_none());
    }
}
