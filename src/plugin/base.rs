//! Plugin Base Wiring
//!
//! Shared plumbing concrete plugins embed: the typed slice handle, state
//! subscription hooks, broadcast/core dispatch, rate-limited dispatch
//! helpers (leading-edge cooldown, trailing-edge debounce) and the
//! readiness signal the registry aggregates over.

use crate::core::sync::lock_recover;
use crate::plugin::context::PluginContext;
use crate::plugin::error::{PluginError, PluginResult};
use crate::store::api::{
    Action, GlobalState, PluginStore, Store, StoreResult, SubscriptionId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub struct PluginBase<T> {
    plugin_id: String,
    store: Store,
    plugin_store: PluginStore<T>,
    cooldowns: Arc<Mutex<HashMap<String, Instant>>>,
    debounces: Arc<Mutex<HashMap<String, tokio::task::JoinHandle<()>>>>,
    ready_tx: tokio::sync::watch::Sender<bool>,
    ready_rx: tokio::sync::watch::Receiver<bool>,
}

impl<T: Clone + Send + 'static> PluginBase<T> {
    /// Bind the base to the plugin's registered slice
    ///
    /// Fails when the slice has not been installed for `plugin_id` yet, or
    /// was installed with a different state type; either way the plugin id
    /// and its package disagree.
    pub fn new(plugin_id: &str, context: &PluginContext) -> PluginResult<Self> {
        let plugin_store =
            context
                .plugin_store::<T>(plugin_id)
                .map_err(|err| PluginError::Registration {
                    message: format!(
                        "plugin '{}' does not match its registered state slice: {}",
                        plugin_id, err
                    ),
                })?;
        let (ready_tx, ready_rx) = tokio::sync::watch::channel(false);
        Ok(Self {
            plugin_id: plugin_id.to_string(),
            store: context.store().clone(),
            plugin_store,
            cooldowns: Arc::new(Mutex::new(HashMap::new())),
            debounces: Arc::new(Mutex::new(HashMap::new())),
            ready_tx,
            ready_rx,
        })
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn store(&self) -> &PluginStore<T> {
        &self.plugin_store
    }

    /// Current slice value (cloned)
    pub fn state(&self) -> StoreResult<T> {
        self.plugin_store.state()
    }

    /// Dispatch to this plugin's own slice
    pub fn dispatch(&self, action: &Action) -> StoreResult<()> {
        self.plugin_store.dispatch(action)
    }

    /// Dispatch to the core reducer
    pub fn dispatch_core_action(&self, action: &Action) {
        self.store.dispatch_to_core(action);
    }

    /// Broadcast to every plugin reducer (core included when the kind is a
    /// declared core kind)
    pub fn dispatch_to_all_plugins(&self, action: &Action) {
        self.store.dispatch(action);
    }

    /// Forward this plugin's slice transitions as `(old, new)`
    pub fn on_store_updated(
        &self,
        hook: impl Fn(&T, &T) + Send + Sync + 'static,
    ) -> StoreResult<SubscriptionId> {
        self.plugin_store
            .subscribe_to_state(move |_action, new_state, old_state| hook(old_state, new_state))
    }

    /// Forward every global state transition as `(old, new)`
    pub fn on_core_store_updated(
        &self,
        hook: impl Fn(&GlobalState, &GlobalState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.store
            .subscribe(move |_action, new_state, old_state| hook(old_state, new_state))
    }

    /// Leading-edge rate limit per action kind: the dispatch is dropped when
    /// less than `window` elapsed since the last dispatch of that kind.
    /// Returns whether the action went through.
    pub fn cooldown_dispatch(&self, action: &Action, window: Duration) -> StoreResult<bool> {
        {
            let mut cooldowns = lock_recover(&self.cooldowns);
            if let Some(last) = cooldowns.get(action.kind()) {
                if last.elapsed() < window {
                    return Ok(false);
                }
            }
            cooldowns.insert(action.kind().to_string(), Instant::now());
        }
        self.dispatch(action)?;
        Ok(true)
    }

    /// Trailing-edge debounce per action kind: (re)schedules the dispatch
    /// `window` in the future, cancelling any previously scheduled dispatch
    /// of the same kind
    ///
    /// Requires a running tokio runtime.
    pub fn debounced_dispatch(&self, action: Action, window: Duration) {
        let kind = action.kind().to_string();
        let mut slots = lock_recover(&self.debounces);
        if let Some(handle) = slots.remove(&kind) {
            handle.abort();
        }
        let plugin_store = self.plugin_store.clone();
        slots.insert(
            kind,
            tokio::spawn(async move {
                tokio::time::sleep(window).await;
                let _ = plugin_store.dispatch(&action);
            }),
        );
    }

    /// Cancel a pending debounced dispatch without firing it; true if one
    /// was pending
    pub fn cancel_debounced_dispatch(&self, kind: &str) -> bool {
        match lock_recover(&self.debounces).remove(kind) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Signal that this plugin finished its asynchronous warm-up
    pub fn mark_ready(&self) {
        let _ = self.ready_tx.send(true);
    }

    /// Return to the not-ready state (for example when a new document
    /// starts loading)
    pub fn reset_ready(&self) {
        let _ = self.ready_tx.send(false);
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Completes once `mark_ready` has been called
    pub async fn ready(&self) {
        let mut receiver = self.ready_rx.clone();
        let _ = receiver.wait_for(|ready| *ready).await;
    }
}

impl<T> Drop for PluginBase<T> {
    fn drop(&mut self) {
        for (_, handle) in lock_recover(&self.debounces).drain() {
            handle.abort();
        }
    }
}

impl<T> std::fmt::Debug for PluginBase<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginBase")
            .field("plugin_id", &self.plugin_id)
            .field("ready", &*self.ready_rx.borrow())
            .finish()
    }
}
