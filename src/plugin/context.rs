//! Registry Context
//!
//! The capability surface a plugin factory receives instead of the registry
//! itself: store access, capability lookup, the pending-registration queue
//! (so plugins may register further plugins during initialization) and the
//! injected logger. Handles are cheap clones.

use crate::core::logging::Logger;
use crate::core::sync::lock_recover;
use crate::plugin::registration::PluginRegistration;
use crate::store::api::{PluginStore, Store, StoreResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct PluginContext {
    store: Store,
    capabilities: Arc<Mutex<HashMap<String, String>>>,
    pending: Arc<Mutex<Vec<PluginRegistration>>>,
    logger: Arc<dyn Logger>,
}

impl Clone for PluginContext {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            capabilities: self.capabilities.clone(),
            pending: self.pending.clone(),
            logger: self.logger.clone(),
        }
    }
}

impl PluginContext {
    pub(crate) fn new(
        store: Store,
        capabilities: Arc<Mutex<HashMap<String, String>>>,
        pending: Arc<Mutex<Vec<PluginRegistration>>>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            store,
            capabilities,
            pending,
            logger,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Typed handle over this plugin's own slice
    pub fn plugin_store<T: Clone + Send + 'static>(
        &self,
        plugin_id: &str,
    ) -> StoreResult<PluginStore<T>> {
        self.store.plugin_store(plugin_id)
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        lock_recover(&self.capabilities).contains_key(capability)
    }

    pub fn capability_owner(&self, capability: &str) -> Option<String> {
        lock_recover(&self.capabilities).get(capability).cloned()
    }

    /// Queue a registration for the next initialization batch
    pub fn register_plugin(&self, registration: PluginRegistration) {
        lock_recover(&self.pending).push(registration);
    }

    pub fn logger(&self) -> Arc<dyn Logger> {
        self.logger.clone()
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let capabilities = lock_recover(&self.capabilities);
        f.debug_struct("PluginContext")
            .field("capabilities", &capabilities.keys().collect::<Vec<_>>())
            .field("pending", &lock_recover(&self.pending).len())
            .finish()
    }
}
