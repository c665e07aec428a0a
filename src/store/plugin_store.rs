//! Scoped Plugin Store Handle
//!
//! Thin typed view over one plugin's slice: reads and dispatches are scoped
//! to the slice, and the action-filtered channel projects global transitions
//! down to it.

use crate::notifications::emitter::SubscriptionId;
use crate::store::action::Action;
use crate::store::error::StoreResult;
use crate::store::manager::Store;
use std::any::Any;
use std::marker::PhantomData;

pub struct PluginStore<T> {
    store: Store,
    plugin_id: String,
    _slice: PhantomData<fn() -> T>,
}

impl<T> Clone for PluginStore<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            plugin_id: self.plugin_id.clone(),
            _slice: PhantomData,
        }
    }
}

impl<T: Any + Clone + Send + 'static> PluginStore<T> {
    pub(crate) fn new(store: Store, plugin_id: String) -> Self {
        Self {
            store,
            plugin_id,
            _slice: PhantomData,
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Current slice value (cloned)
    pub fn state(&self) -> StoreResult<T> {
        self.store.plugin_state::<T>(&self.plugin_id)
    }

    /// Dispatch to this plugin's reducer, notifying the global channel too
    pub fn dispatch(&self, action: &Action) -> StoreResult<()> {
        self.store.dispatch_to_plugin(&self.plugin_id, action, true)
    }

    /// Subscribe to this slice's transitions: `(action, new, old)`
    pub fn subscribe_to_state(
        &self,
        listener: impl Fn(&Action, &T, &T) + Send + Sync + 'static,
    ) -> StoreResult<SubscriptionId> {
        self.store.subscribe_to_plugin(&self.plugin_id, listener)
    }

    /// Filter the global channel by action kind, projecting both states
    /// down to this plugin's slice before invoking the handler
    pub fn on_action(
        &self,
        kind: impl Into<String>,
        handler: impl Fn(&Action, &T, &T) + Send + Sync + 'static,
    ) -> StoreResult<SubscriptionId> {
        // registration guard: same contract as subscribe_to_state
        self.state()?;
        let kind = kind.into();
        let plugin_id = self.plugin_id.clone();
        Ok(self.store.subscribe(move |action, new_state, old_state| {
            if action.kind() != kind {
                return;
            }
            if let (Some(new), Some(old)) = (
                new_state.plugin::<T>(&plugin_id),
                old_state.plugin::<T>(&plugin_id),
            ) {
                handler(action, new, old);
            }
        }))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }
}

impl<T> std::fmt::Debug for PluginStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginStore")
            .field("plugin_id", &self.plugin_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct CounterState {
        count: usize,
    }

    const BUMP: &str = "counter/bump";

    fn counter_store() -> Store {
        let store = Store::with_core_defaults();
        store
            .add_plugin_reducer(
                "counter",
                |state: &CounterState, action| match action.kind() {
                    BUMP => CounterState {
                        count: state.count + 1,
                    },
                    _ => state.clone(),
                },
                CounterState { count: 0 },
            )
            .unwrap();
        store
    }

    #[test]
    fn test_scoped_state_and_dispatch() {
        let store = counter_store();
        let handle = store.plugin_store::<CounterState>("counter").unwrap();

        assert_eq!(handle.state().unwrap(), CounterState { count: 0 });
        handle.dispatch(&Action::new(BUMP)).unwrap();
        assert_eq!(handle.state().unwrap(), CounterState { count: 1 });
    }

    #[test]
    fn test_subscribe_to_state_sees_slice_transitions() {
        let store = counter_store();
        let handle = store.plugin_store::<CounterState>("counter").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let sink = calls.clone();
        handle
            .subscribe_to_state(move |_, new_state, old_state| {
                assert_eq!(new_state.count, old_state.count + 1);
                sink.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        handle.dispatch(&Action::new(BUMP)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_on_action_filters_and_projects() {
        let store = counter_store();
        let handle = store.plugin_store::<CounterState>("counter").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let sink = calls.clone();
        handle
            .on_action(BUMP, move |action, new_state, _old| {
                assert_eq!(action.kind(), BUMP);
                assert!(new_state.count > 0);
                sink.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        // broadcast of an unrelated kind passes the filter by
        store.dispatch(&Action::new("other/no-op"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.dispatch(&Action::new(BUMP));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // slice-targeted dispatch flows through the global channel as well
        handle.dispatch(&Action::new(BUMP)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_wrong_slice_type_is_rejected() {
        let store = counter_store();
        assert!(store.plugin_store::<u32>("counter").is_err());
    }
}
