//! Store Manager
//!
//! The shared state container. Handles are cheap clones over one inner
//! state; reducers run under the state lock, listener invocation happens
//! after it is released so a listener may dispatch again without
//! deadlocking.

use crate::core::sync::lock_recover;
use crate::notifications::emitter::SubscriptionId;
use crate::store::action::Action;
use crate::store::error::{StoreError, StoreResult};
use crate::store::plugin_store::PluginStore;
use crate::store::state::{core_reducer, CoreState, GlobalState, StateSlice, CORE_ACTION_KINDS};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub(crate) type SliceReducer =
    Arc<dyn Fn(&dyn StateSlice, &Action) -> Box<dyn StateSlice> + Send + Sync>;
type CoreReducer = Arc<dyn Fn(&CoreState, &Action) -> CoreState + Send + Sync>;
type GlobalListener = Arc<dyn Fn(&Action, &GlobalState, &GlobalState) + Send + Sync>;
type SliceListener = Arc<dyn Fn(&Action, &dyn StateSlice, &dyn StateSlice) + Send + Sync>;

struct StoreInner {
    core_reducer: CoreReducer,
    core_action_kinds: HashSet<String>,
    initial_core: CoreState,
    core: CoreState,
    slices: HashMap<String, Box<dyn StateSlice>>,
    slice_reducers: HashMap<String, SliceReducer>,
    plugin_order: Vec<String>,
    global_listeners: Vec<(SubscriptionId, GlobalListener)>,
    slice_listeners: HashMap<String, Vec<(SubscriptionId, SliceListener)>>,
    next_subscription: SubscriptionId,
}

impl StoreInner {
    fn snapshot(&self) -> GlobalState {
        GlobalState::new(self.core.clone(), self.slices.clone())
    }

    fn next_id(&mut self) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        id
    }

    fn global_listener_snapshot(&self) -> Vec<GlobalListener> {
        self.global_listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    fn slice_listener_snapshot(&self, plugin_id: &str) -> Vec<SliceListener> {
        self.slice_listeners
            .get(plugin_id)
            .map(|listeners| {
                listeners
                    .iter()
                    .map(|(_, listener)| listener.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Two-tier state container
pub struct Store {
    inner: Arc<Mutex<StoreInner>>,
}

impl Clone for Store {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Store {
    pub fn new(
        core_reducer: impl Fn(&CoreState, &Action) -> CoreState + Send + Sync + 'static,
        core_action_kinds: &[&str],
        initial_core: CoreState,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                core_reducer: Arc::new(core_reducer),
                core_action_kinds: core_action_kinds.iter().map(|k| k.to_string()).collect(),
                initial_core: initial_core.clone(),
                core: initial_core,
                slices: HashMap::new(),
                slice_reducers: HashMap::new(),
                plugin_order: Vec::new(),
                global_listeners: Vec::new(),
                slice_listeners: HashMap::new(),
                next_subscription: 1,
            })),
        }
    }

    /// Store over the built-in viewer core reducer
    pub fn with_core_defaults() -> Self {
        Self::new(core_reducer, CORE_ACTION_KINDS, CoreState::default())
    }

    /// Register one reducer and its initial slice for a plugin id
    ///
    /// Must run before any dispatch or subscription targeting the plugin.
    pub fn add_plugin_reducer<T: Clone + Send + 'static>(
        &self,
        plugin_id: &str,
        reducer: impl Fn(&T, &Action) -> T + Send + Sync + 'static,
        initial_state: T,
    ) -> StoreResult<()> {
        let erased: SliceReducer =
            Arc::new(
                move |slice: &dyn StateSlice, action: &Action| match slice
                    .as_any()
                    .downcast_ref::<T>()
                {
                    Some(state) => Box::new(reducer(state, action)),
                    None => slice.clone_slice(),
                },
            );
        self.add_plugin_reducer_boxed(plugin_id, erased, Box::new(initial_state))
    }

    pub(crate) fn add_plugin_reducer_boxed(
        &self,
        plugin_id: &str,
        reducer: SliceReducer,
        initial_state: Box<dyn StateSlice>,
    ) -> StoreResult<()> {
        let mut inner = lock_recover(&self.inner);
        if inner.slice_reducers.contains_key(plugin_id) {
            return Err(StoreError::DuplicateReducer {
                plugin_id: plugin_id.to_string(),
            });
        }
        inner
            .slice_reducers
            .insert(plugin_id.to_string(), reducer);
        inner.slices.insert(plugin_id.to_string(), initial_state);
        inner.plugin_order.push(plugin_id.to_string());
        Ok(())
    }

    pub fn has_plugin_reducer(&self, plugin_id: &str) -> bool {
        lock_recover(&self.inner)
            .slice_reducers
            .contains_key(plugin_id)
    }

    /// Run only the core reducer and notify global listeners
    pub fn dispatch_to_core(&self, action: &Action) {
        let (old_state, new_state, listeners) = {
            let mut inner = lock_recover(&self.inner);
            let old = inner.snapshot();
            inner.core = (*inner.core_reducer)(&inner.core, action);
            let new = inner.snapshot();
            (old, new, inner.global_listener_snapshot())
        };
        for listener in listeners {
            (*listener)(action, &new_state, &old_state);
        }
    }

    /// Run only one plugin's reducer
    ///
    /// That plugin's own listeners are always notified; global listeners
    /// only when `notify_global` is set.
    pub fn dispatch_to_plugin(
        &self,
        plugin_id: &str,
        action: &Action,
        notify_global: bool,
    ) -> StoreResult<()> {
        let (old_slice, new_slice, slice_listeners, globals) = {
            let mut inner = lock_recover(&self.inner);
            let reducer = inner.slice_reducers.get(plugin_id).cloned().ok_or_else(|| {
                StoreError::UnknownPlugin {
                    plugin_id: plugin_id.to_string(),
                }
            })?;
            let old_slice = inner.slices.get(plugin_id).cloned().ok_or_else(|| {
                StoreError::UnknownPlugin {
                    plugin_id: plugin_id.to_string(),
                }
            })?;
            let old_global = notify_global.then(|| inner.snapshot());
            let new_slice = (*reducer)(old_slice.as_ref(), action);
            inner
                .slices
                .insert(plugin_id.to_string(), new_slice.clone());
            let globals = old_global.map(|old| {
                (
                    old,
                    inner.snapshot(),
                    inner.global_listener_snapshot(),
                )
            });
            (
                old_slice,
                new_slice,
                inner.slice_listener_snapshot(plugin_id),
                globals,
            )
        };

        for listener in slice_listeners {
            (*listener)(action, new_slice.as_ref(), old_slice.as_ref());
        }
        if let Some((old_global, new_global, listeners)) = globals {
            for listener in listeners {
                (*listener)(action, &new_global, &old_global);
            }
        }
        Ok(())
    }

    /// Broadcast dispatch
    ///
    /// The core reducer runs only when the action kind is a declared core
    /// kind; every registered plugin reducer runs unconditionally and
    /// decides relevance itself. Global listeners are notified exactly once.
    pub fn dispatch(&self, action: &Action) {
        let (old_state, new_state, listeners) = {
            let mut inner = lock_recover(&self.inner);
            let old = inner.snapshot();
            if inner.core_action_kinds.contains(action.kind()) {
                inner.core = (*inner.core_reducer)(&inner.core, action);
            }
            for plugin_id in inner.plugin_order.clone() {
                let pair = inner
                    .slice_reducers
                    .get(&plugin_id)
                    .cloned()
                    .zip(inner.slices.get(&plugin_id).cloned());
                if let Some((reducer, slice)) = pair {
                    let new_slice = (*reducer)(slice.as_ref(), action);
                    inner.slices.insert(plugin_id, new_slice);
                }
            }
            let new = inner.snapshot();
            (old, new, inner.global_listener_snapshot())
        };
        for listener in listeners {
            (*listener)(action, &new_state, &old_state);
        }
    }

    /// Subscribe to every state transition
    pub fn subscribe(
        &self,
        listener: impl Fn(&Action, &GlobalState, &GlobalState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut inner = lock_recover(&self.inner);
        let id = inner.next_id();
        inner.global_listeners.push((id, Arc::new(listener)));
        id
    }

    /// Subscribe to one plugin's slice transitions
    ///
    /// Fails when the plugin id has no registered reducer, guarding against
    /// use-before-registration.
    pub fn subscribe_to_plugin<T: Any>(
        &self,
        plugin_id: &str,
        listener: impl Fn(&Action, &T, &T) + Send + Sync + 'static,
    ) -> StoreResult<SubscriptionId> {
        let mut inner = lock_recover(&self.inner);
        if !inner.slice_reducers.contains_key(plugin_id) {
            return Err(StoreError::UnknownPlugin {
                plugin_id: plugin_id.to_string(),
            });
        }
        let id = inner.next_id();
        let erased: SliceListener = Arc::new(move |action, new_slice, old_slice| {
            if let (Some(new), Some(old)) = (
                new_slice.as_any().downcast_ref::<T>(),
                old_slice.as_any().downcast_ref::<T>(),
            ) {
                listener(action, new, old);
            }
        });
        inner
            .slice_listeners
            .entry(plugin_id.to_string())
            .or_default()
            .push((id, erased));
        Ok(id)
    }

    /// Remove a subscription from either channel; true if found
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = lock_recover(&self.inner);
        let before = inner.global_listeners.len();
        inner
            .global_listeners
            .retain(|(listener_id, _)| *listener_id != id);
        if inner.global_listeners.len() != before {
            return true;
        }
        for listeners in inner.slice_listeners.values_mut() {
            let before = listeners.len();
            listeners.retain(|(listener_id, _)| *listener_id != id);
            if listeners.len() != before {
                return true;
            }
        }
        false
    }

    /// One-level-deep snapshot of the whole store
    pub fn get_state(&self) -> GlobalState {
        lock_recover(&self.inner).snapshot()
    }

    pub fn core_state(&self) -> CoreState {
        lock_recover(&self.inner).core.clone()
    }

    /// Typed clone of one plugin slice
    pub fn plugin_state<T: Any + Clone>(&self, plugin_id: &str) -> StoreResult<T> {
        let inner = lock_recover(&self.inner);
        let slice = inner
            .slices
            .get(plugin_id)
            .ok_or_else(|| StoreError::UnknownPlugin {
                plugin_id: plugin_id.to_string(),
            })?;
        slice
            .as_any()
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| StoreError::SliceTypeMismatch {
                plugin_id: plugin_id.to_string(),
            })
    }

    /// Scoped handle over one plugin's slice
    ///
    /// Fails when the plugin id has no registered reducer or the slice is
    /// not of type `T`.
    pub fn plugin_store<T: Any + Clone + Send + 'static>(
        &self,
        plugin_id: &str,
    ) -> StoreResult<PluginStore<T>> {
        self.plugin_state::<T>(plugin_id)?;
        Ok(PluginStore::new(self.clone(), plugin_id.to_string()))
    }

    /// Drop a plugin's reducer, slice and slice listeners
    pub fn remove_plugin(&self, plugin_id: &str) {
        let mut inner = lock_recover(&self.inner);
        inner.slice_reducers.remove(plugin_id);
        inner.slices.remove(plugin_id);
        inner.slice_listeners.remove(plugin_id);
        inner.plugin_order.retain(|id| id != plugin_id);
    }

    /// Clear all listeners and plugin reducers, reset core to its initial
    /// snapshot
    pub fn destroy(&self) {
        let mut inner = lock_recover(&self.inner);
        inner.global_listeners.clear();
        inner.slice_listeners.clear();
        inner.slice_reducers.clear();
        inner.slices.clear();
        inner.plugin_order.clear();
        inner.core = inner.initial_core.clone();
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock_recover(&self.inner);
        f.debug_struct("Store")
            .field("core", &inner.core)
            .field("plugins", &inner.plugin_order)
            .field("global_listeners", &inner.global_listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::state::{SET_SCALE, SET_LOADING};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct ProbeState {
        relevant: usize,
        irrelevant: usize,
    }

    const PROBE_BUMP: &str = "probe/bump";

    fn probe_reducer(state: &ProbeState, action: &Action) -> ProbeState {
        match action.kind() {
            PROBE_BUMP => ProbeState {
                relevant: state.relevant + 1,
                ..*state
            },
            _ => ProbeState {
                irrelevant: state.irrelevant + 1,
                ..*state
            },
        }
    }

    fn probe_store() -> Store {
        let store = Store::with_core_defaults();
        store
            .add_plugin_reducer(
                "probe",
                probe_reducer,
                ProbeState {
                    relevant: 0,
                    irrelevant: 0,
                },
            )
            .unwrap();
        store
    }

    #[test]
    fn test_dispatch_to_core_notifies_global_listeners() {
        let store = probe_store();
        let observed = Arc::new(Mutex::new(Vec::new()));

        let sink = observed.clone();
        store.subscribe(move |action, new_state, old_state| {
            sink.lock().unwrap().push((
                action.kind().to_string(),
                old_state.core.scale,
                new_state.core.scale,
            ));
        });

        store.dispatch_to_core(&Action::with_payload(
            SET_SCALE,
            serde_json::json!({"scale": 2.0}),
        ));

        assert_eq!(
            *observed.lock().unwrap(),
            vec![(SET_SCALE.to_string(), 1.0, 2.0)]
        );
        // core-only dispatch leaves plugin slices alone
        assert_eq!(
            store.plugin_state::<ProbeState>("probe").unwrap(),
            ProbeState {
                relevant: 0,
                irrelevant: 0
            }
        );
    }

    #[test]
    fn test_broadcast_reaches_every_plugin_reducer() {
        let store = probe_store();

        // not a core kind: core stays put, the plugin reducer still runs
        store.dispatch(&Action::new("zoom/wheel"));

        assert_eq!(store.core_state(), CoreState::default());
        assert_eq!(
            store.plugin_state::<ProbeState>("probe").unwrap(),
            ProbeState {
                relevant: 0,
                irrelevant: 1
            }
        );

        // a core kind runs both tiers
        store.dispatch(&Action::with_payload(
            SET_LOADING,
            serde_json::json!({"loading": true}),
        ));
        assert!(store.core_state().loading);
        assert_eq!(
            store.plugin_state::<ProbeState>("probe").unwrap(),
            ProbeState {
                relevant: 0,
                irrelevant: 2
            }
        );
    }

    #[test]
    fn test_broadcast_notifies_global_listeners_once() {
        let store = probe_store();
        let calls = Arc::new(AtomicUsize::new(0));

        let sink = calls.clone();
        store.subscribe(move |_, _, _| {
            sink.fetch_add(1, Ordering::SeqCst);
        });

        store.dispatch(&Action::new(PROBE_BUMP));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_to_plugin_channels() {
        let store = probe_store();
        let slice_calls = Arc::new(AtomicUsize::new(0));
        let global_calls = Arc::new(AtomicUsize::new(0));

        let sink = slice_calls.clone();
        store
            .subscribe_to_plugin::<ProbeState>("probe", move |_, new_state, old_state| {
                assert_eq!(new_state.relevant, old_state.relevant + 1);
                sink.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let sink = global_calls.clone();
        store.subscribe(move |_, _, _| {
            sink.fetch_add(1, Ordering::SeqCst);
        });

        store
            .dispatch_to_plugin("probe", &Action::new(PROBE_BUMP), true)
            .unwrap();
        assert_eq!(slice_calls.load(Ordering::SeqCst), 1);
        assert_eq!(global_calls.load(Ordering::SeqCst), 1);

        // plugin listeners still fire when the global channel is skipped
        store
            .dispatch_to_plugin("probe", &Action::new(PROBE_BUMP), false)
            .unwrap();
        assert_eq!(slice_calls.load(Ordering::SeqCst), 2);
        assert_eq!(global_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_use_before_registration_is_an_error() {
        let store = Store::with_core_defaults();

        assert_eq!(
            store
                .dispatch_to_plugin("ghost", &Action::new(PROBE_BUMP), true)
                .unwrap_err(),
            StoreError::UnknownPlugin {
                plugin_id: "ghost".to_string()
            }
        );
        assert!(store
            .subscribe_to_plugin::<ProbeState>("ghost", |_, _, _| {})
            .is_err());
        assert!(store.plugin_store::<ProbeState>("ghost").is_err());
    }

    #[test]
    fn test_duplicate_reducer_is_an_error() {
        let store = probe_store();
        let result = store.add_plugin_reducer(
            "probe",
            probe_reducer,
            ProbeState {
                relevant: 0,
                irrelevant: 0,
            },
        );
        assert_eq!(
            result.unwrap_err(),
            StoreError::DuplicateReducer {
                plugin_id: "probe".to_string()
            }
        );
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = probe_store();
        let calls = Arc::new(AtomicUsize::new(0));

        let sink = calls.clone();
        let id = store.subscribe(move |_, _, _| {
            sink.fetch_add(1, Ordering::SeqCst);
        });

        store.dispatch(&Action::new(PROBE_BUMP));
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.dispatch(&Action::new(PROBE_BUMP));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_get_state_is_a_snapshot() {
        let store = probe_store();
        let before = store.get_state();

        store.dispatch(&Action::new(PROBE_BUMP));

        // the earlier snapshot does not observe the new dispatch
        assert_eq!(
            before.plugin::<ProbeState>("probe").unwrap().relevant,
            0
        );
        assert_eq!(
            store
                .get_state()
                .plugin::<ProbeState>("probe")
                .unwrap()
                .relevant,
            1
        );
    }

    #[test]
    fn test_listener_dispatching_again_does_not_deadlock() {
        let store = probe_store();
        let fired = Arc::new(AtomicUsize::new(0));

        let chained = store.clone();
        let sink = fired.clone();
        store.subscribe(move |action, _, _| {
            if action.kind() == PROBE_BUMP && sink.fetch_add(1, Ordering::SeqCst) == 0 {
                chained.dispatch_to_core(&Action::with_payload(
                    SET_LOADING,
                    serde_json::json!({"loading": true}),
                ));
            }
        });

        store.dispatch(&Action::new(PROBE_BUMP));
        assert!(store.core_state().loading);
    }

    #[test]
    fn test_destroy_resets_core_and_clears_reducers() {
        let store = probe_store();
        store.dispatch_to_core(&Action::with_payload(
            SET_SCALE,
            serde_json::json!({"scale": 3.0}),
        ));
        assert_eq!(store.core_state().scale, 3.0);

        store.destroy();

        assert_eq!(store.core_state(), CoreState::default());
        assert!(!store.has_plugin_reducer("probe"));
        assert!(store.plugin_state::<ProbeState>("probe").is_err());
    }

    #[test]
    fn test_remove_plugin_drops_slice() {
        let store = probe_store();
        store.remove_plugin("probe");
        assert!(store
            .dispatch_to_plugin("probe", &Action::new(PROBE_BUMP), true)
            .is_err());
    }
}
