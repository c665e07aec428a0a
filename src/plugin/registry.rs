//! Plugin Registry
//!
//! Owns the store, the dependency resolver and all plugin bookkeeping, and
//! orchestrates asynchronous multi-phase initialization: engine warm-up,
//! per-batch dependency resolution, sequential construction in topological
//! order with rollback on failure, and an isolated post-initialization
//! phase. Teardown runs in reverse registration order.

use crate::core::logging::{Logger, NoopLogger};
use crate::core::sync::lock_recover;
use crate::engine::PdfEngine;
use crate::plugin::context::PluginContext;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::manifest::PluginManifest;
use crate::plugin::registration::{InitialSliceState, PluginRegistration};
use crate::plugin::resolver::DependencyResolver;
use crate::plugin::traits::Plugin;
use crate::plugin::types::{PluginStatus, RegistryPhase};
use crate::store::api::Store;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const LOG_SOURCE: &str = "registry";

pub struct PluginRegistry {
    store: Store,
    engine: Arc<dyn PdfEngine>,
    logger: Arc<dyn Logger>,
    pending: Arc<Mutex<Vec<PluginRegistration>>>,
    capabilities: Arc<Mutex<HashMap<String, String>>>,
    plugins: HashMap<String, Box<dyn Plugin>>,
    manifests: HashMap<String, PluginManifest>,
    configs: HashMap<String, toml::Table>,
    statuses: HashMap<String, PluginStatus>,
    registration_order: Vec<String>,
    phase: RegistryPhase,
    destroyed: bool,
    engine_ready: bool,
    init_outcome: Option<PluginResult<()>>,
}

impl PluginRegistry {
    pub fn new(engine: Arc<dyn PdfEngine>) -> Self {
        Self {
            store: Store::with_core_defaults(),
            engine,
            logger: Arc::new(NoopLogger),
            pending: Arc::new(Mutex::new(Vec::new())),
            capabilities: Arc::new(Mutex::new(HashMap::new())),
            plugins: HashMap::new(),
            manifests: HashMap::new(),
            configs: HashMap::new(),
            statuses: HashMap::new(),
            registration_order: Vec::new(),
            phase: RegistryPhase::Uninitialized,
            destroyed: false,
            engine_ready: false,
            init_outcome: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Context handle passed to plugin factories
    pub fn context(&self) -> PluginContext {
        PluginContext::new(
            self.store.clone(),
            self.capabilities.clone(),
            self.pending.clone(),
            self.logger.clone(),
        )
    }

    /// Queue a registration
    ///
    /// Legal before initialization completes, and re-entrantly while it
    /// runs (plugins registering further plugins); afterwards registration
    /// is rejected.
    pub fn register_plugin(&self, registration: PluginRegistration) -> PluginResult<()> {
        if self.destroyed {
            return Err(PluginError::Registration {
                message: "registry has been destroyed".to_string(),
            });
        }
        if self.phase == RegistryPhase::Initialized {
            return Err(PluginError::Registration {
                message: format!(
                    "plugin '{}' registered after initialization completed",
                    registration.plugin_id()
                ),
            });
        }
        registration.manifest().validate()?;

        let plugin_id = registration.plugin_id().to_string();
        let duplicate = self.plugins.contains_key(&plugin_id)
            || lock_recover(&self.pending)
                .iter()
                .any(|pending| pending.plugin_id() == plugin_id);
        if duplicate {
            return Err(PluginError::Registration {
                message: format!("plugin id '{}' is already registered", plugin_id),
            });
        }

        self.logger.debug(
            LOG_SOURCE,
            "lifecycle",
            &format!("plugin '{}' queued for initialization", plugin_id),
        );
        lock_recover(&self.pending).push(registration);
        Ok(())
    }

    pub fn register_plugin_batch(
        &self,
        registrations: Vec<PluginRegistration>,
    ) -> PluginResult<()> {
        for registration in registrations {
            self.register_plugin(registration)?;
        }
        Ok(())
    }

    /// Multi-phase initialization
    ///
    /// Repeat calls return the recorded outcome of the first run. A failed
    /// run leaves the registry destroyable but not usable; call `destroy`
    /// to clean up partially-initialized plugins rather than retrying.
    pub async fn initialize(&mut self) -> PluginResult<()> {
        if self.destroyed {
            return Err(PluginError::Registration {
                message: "registry has been destroyed".to_string(),
            });
        }
        if let Some(outcome) = &self.init_outcome {
            return outcome.clone();
        }

        self.phase = RegistryPhase::Initializing;
        let outcome = self.run_initialization().await;
        self.phase = RegistryPhase::Initialized;
        self.init_outcome = Some(outcome.clone());
        outcome
    }

    async fn run_initialization(&mut self) -> PluginResult<()> {
        self.ensure_engine_initialized().await?;

        // loop until no pending registrations remain, so plugins queued
        // mid-batch run as their own later batch
        loop {
            let batch: Vec<PluginRegistration> = {
                let mut pending = lock_recover(&self.pending);
                pending.drain(..).collect()
            };
            if batch.is_empty() {
                break;
            }
            self.initialize_batch(batch).await?;
        }

        for plugin_id in self.registration_order.clone() {
            if self.statuses.get(&plugin_id) != Some(&PluginStatus::Active) {
                continue;
            }
            let result = match self.plugins.get_mut(&plugin_id) {
                Some(plugin) => plugin.post_initialize().await,
                None => continue,
            };
            match result {
                Ok(()) => self.logger.debug(
                    LOG_SOURCE,
                    "lifecycle",
                    &format!("plugin '{}' post-initialized", plugin_id),
                ),
                Err(err) => {
                    // isolated: the plugin is flagged, everything else
                    // keeps running
                    self.statuses.insert(plugin_id.clone(), PluginStatus::Error);
                    self.logger.error(
                        LOG_SOURCE,
                        "lifecycle",
                        &format!("plugin '{}' post-initialize failed: {}", plugin_id, err),
                    );
                }
            }
        }

        self.logger.info(
            LOG_SOURCE,
            "lifecycle",
            &format!("initialization complete, {} plugins active", self.active_plugins().len()),
        );
        Ok(())
    }

    async fn initialize_batch(&mut self, batch: Vec<PluginRegistration>) -> PluginResult<()> {
        // sibling-batch capability index; capabilities of already-active
        // plugins need no ordering edge
        let mut batch_provides: HashMap<String, String> = HashMap::new();
        for registration in &batch {
            let manifest = registration.manifest();
            for capability in &manifest.provides {
                batch_provides
                    .entry(capability.clone())
                    .or_insert_with(|| manifest.id.clone());
            }
        }

        let mut resolver = DependencyResolver::new();
        for registration in &batch {
            let manifest = registration.manifest();
            let dependencies: Vec<String> = manifest
                .dependency_capabilities()
                .filter_map(|capability| batch_provides.get(capability))
                .filter(|provider| **provider != manifest.id)
                .cloned()
                .collect();
            resolver.add_node(&manifest.id, &dependencies);
        }

        if resolver.has_circular_dependencies() {
            let message = match resolver.resolve_load_order() {
                Err(err) => err.to_string(),
                Ok(_) => "dependency cycle detected in registration batch".to_string(),
            };
            self.logger.error(LOG_SOURCE, "dependency", &message);
            return Err(PluginError::CircularDependency { message });
        }
        let order = resolver.resolve_load_order()?;

        let mut by_id: HashMap<String, PluginRegistration> = batch
            .into_iter()
            .map(|registration| (registration.plugin_id().to_string(), registration))
            .collect();

        // strictly sequential so later plugins can rely on earlier
        // capabilities being claimed
        for plugin_id in order {
            if let Some(registration) = by_id.remove(&plugin_id) {
                self.initialize_plugin(registration).await?;
            }
        }
        Ok(())
    }

    async fn ensure_engine_initialized(&mut self) -> PluginResult<()> {
        if self.engine_ready {
            return Ok(());
        }
        if let Some(task) = self.engine.initialize() {
            task.to_future()
                .await
                .map_err(|err| PluginError::Initialization {
                    plugin_id: "engine".to_string(),
                    cause: err.to_string(),
                })?;
        }
        self.engine_ready = true;
        self.logger.debug(LOG_SOURCE, "lifecycle", "engine initialized");
        Ok(())
    }

    /// Construct and initialize one plugin, rolling back every side effect
    /// on failure so no capability claim or bookkeeping entry leaks
    async fn initialize_plugin(&mut self, registration: PluginRegistration) -> PluginResult<()> {
        let PluginRegistration { package, config } = registration;
        let manifest = package.manifest.clone();
        let plugin_id = manifest.id.clone();

        let merged = merge_config(&manifest.default_config, &config);
        validate_config_keys(&manifest, &merged)?;

        // the slice must exist before the factory runs: construction binds
        // the plugin's store handle
        let initial_slice = match package.initial_state {
            InitialSliceState::Value(slice) => slice,
            InitialSliceState::FromCore(derive) => derive(&self.store.core_state(), &merged),
        };
        self.store
            .add_plugin_reducer_boxed(&plugin_id, package.reducer, initial_slice)?;

        match self
            .construct_and_activate(&plugin_id, manifest, merged, package.factory)
            .await
        {
            Ok(()) => Ok(()),
            Err(err) => {
                self.rollback_plugin(&plugin_id);
                self.logger.error(
                    LOG_SOURCE,
                    "lifecycle",
                    &format!("plugin '{}' initialization failed: {}", plugin_id, err),
                );
                Err(err)
            }
        }
    }

    async fn construct_and_activate(
        &mut self,
        plugin_id: &str,
        manifest: PluginManifest,
        merged_config: toml::Table,
        factory: crate::plugin::registration::PluginFactory,
    ) -> PluginResult<()> {
        let context = self.context();
        let plugin =
            factory(&context, &merged_config).map_err(|err| PluginError::Initialization {
                plugin_id: plugin_id.to_string(),
                cause: format!("factory failed: {}", err),
            })?;

        if plugin.id().trim().is_empty() {
            return Err(PluginError::Registration {
                message: format!("plugin '{}' constructed an instance without an id", plugin_id),
            });
        }
        if plugin.id() != plugin_id {
            return Err(PluginError::Registration {
                message: format!(
                    "plugin instance id '{}' does not match manifest id '{}'",
                    plugin.id(),
                    plugin_id
                ),
            });
        }

        {
            let capabilities = lock_recover(&self.capabilities);
            for capability in &manifest.requires {
                if !capabilities.contains_key(capability) {
                    return Err(PluginError::CapabilityNotFound {
                        plugin_id: plugin_id.to_string(),
                        capability: capability.clone(),
                    });
                }
            }
            for capability in &manifest.optional {
                if capabilities.contains_key(capability) {
                    self.logger.debug(
                        LOG_SOURCE,
                        "capability",
                        &format!(
                            "optional capability '{}' already available for '{}'",
                            capability, plugin_id
                        ),
                    );
                } else {
                    self.logger.warn(
                        LOG_SOURCE,
                        "capability",
                        &format!(
                            "optional capability '{}' missing for '{}'",
                            capability, plugin_id
                        ),
                    );
                }
            }
        }

        {
            let mut capabilities = lock_recover(&self.capabilities);
            for capability in &manifest.provides {
                if let Some(owner) = capabilities.get(capability) {
                    // partial claims of this call are released by rollback
                    return Err(PluginError::CapabilityConflict {
                        capability: capability.clone(),
                        owner: owner.clone(),
                        claimant: plugin_id.to_string(),
                    });
                }
                capabilities.insert(capability.clone(), plugin_id.to_string());
            }
        }

        self.plugins.insert(plugin_id.to_string(), plugin);
        self.manifests.insert(plugin_id.to_string(), manifest);
        self.configs
            .insert(plugin_id.to_string(), merged_config.clone());
        self.statuses
            .insert(plugin_id.to_string(), PluginStatus::Registered);
        self.registration_order.push(plugin_id.to_string());

        let result = match self.plugins.get_mut(plugin_id) {
            Some(plugin) => plugin.initialize(&merged_config).await,
            None => Ok(()),
        };
        result.map_err(|err| PluginError::Initialization {
            plugin_id: plugin_id.to_string(),
            cause: err.to_string(),
        })?;

        self.statuses
            .insert(plugin_id.to_string(), PluginStatus::Active);
        self.logger.info(
            LOG_SOURCE,
            "lifecycle",
            &format!("plugin '{}' initialized", plugin_id),
        );
        Ok(())
    }

    fn rollback_plugin(&mut self, plugin_id: &str) {
        self.plugins.remove(plugin_id);
        self.manifests.remove(plugin_id);
        self.configs.remove(plugin_id);
        self.statuses.remove(plugin_id);
        self.registration_order.retain(|id| id != plugin_id);
        lock_recover(&self.capabilities).retain(|_, owner| owner != plugin_id);
        self.store.remove_plugin(plugin_id);
    }

    /// Remove one plugin
    ///
    /// Refused while any other registered plugin references a capability
    /// this plugin provides; dependents must be removed first.
    pub async fn unregister_plugin(&mut self, plugin_id: &str) -> PluginResult<()> {
        let manifest =
            self.manifests
                .get(plugin_id)
                .cloned()
                .ok_or_else(|| PluginError::PluginNotFound {
                    plugin_id: plugin_id.to_string(),
                })?;

        for (other_id, other_manifest) in &self.manifests {
            if other_id == plugin_id {
                continue;
            }
            if let Some(capability) = other_manifest
                .dependency_capabilities()
                .find(|capability| manifest.provides.iter().any(|p| p == capability))
            {
                return Err(PluginError::Registration {
                    message: format!(
                        "cannot unregister '{}': plugin '{}' depends on capability '{}'",
                        plugin_id, other_id, capability
                    ),
                });
            }
        }

        if let Some(mut plugin) = self.plugins.remove(plugin_id) {
            if let Err(err) = plugin.destroy().await {
                self.logger.warn(
                    LOG_SOURCE,
                    "lifecycle",
                    &format!("plugin '{}' destroy failed: {}", plugin_id, err),
                );
            }
        }
        self.manifests.remove(plugin_id);
        self.configs.remove(plugin_id);
        self.statuses.remove(plugin_id);
        self.registration_order.retain(|id| id != plugin_id);
        lock_recover(&self.capabilities).retain(|_, owner| owner != plugin_id);
        self.store.remove_plugin(plugin_id);

        self.logger.info(
            LOG_SOURCE,
            "lifecycle",
            &format!("plugin '{}' unregistered", plugin_id),
        );
        Ok(())
    }

    /// Tear down every plugin (last registered first) and the store
    ///
    /// Single-use: a second call is an error.
    pub async fn destroy(&mut self) -> PluginResult<()> {
        if self.destroyed {
            return Err(PluginError::Registration {
                message: "registry already destroyed".to_string(),
            });
        }
        self.destroyed = true;

        for plugin_id in self.registration_order.clone().into_iter().rev() {
            if let Some(mut plugin) = self.plugins.remove(&plugin_id) {
                if let Err(err) = plugin.destroy().await {
                    self.logger.warn(
                        LOG_SOURCE,
                        "lifecycle",
                        &format!("plugin '{}' destroy failed: {}", plugin_id, err),
                    );
                }
            }
        }

        self.store.destroy();
        self.manifests.clear();
        self.configs.clear();
        self.statuses.clear();
        self.registration_order.clear();
        lock_recover(&self.capabilities).clear();
        lock_recover(&self.pending).clear();

        self.logger.info(LOG_SOURCE, "lifecycle", "registry destroyed");
        Ok(())
    }

    /// Merge a partial config onto the stored one, re-validate against the
    /// manifest defaults, and re-invoke the plugin's `initialize`
    pub async fn update_plugin_config(
        &mut self,
        plugin_id: &str,
        partial: toml::Table,
    ) -> PluginResult<()> {
        let manifest =
            self.manifests
                .get(plugin_id)
                .ok_or_else(|| PluginError::PluginNotFound {
                    plugin_id: plugin_id.to_string(),
                })?;
        let current = self
            .configs
            .get(plugin_id)
            .cloned()
            .unwrap_or_default();

        let merged = merge_config(&current, &partial);
        validate_config_keys(manifest, &merged)?;
        self.configs.insert(plugin_id.to_string(), merged.clone());

        let plugin = self
            .plugins
            .get_mut(plugin_id)
            .ok_or_else(|| PluginError::PluginNotFound {
                plugin_id: plugin_id.to_string(),
            })?;
        plugin
            .initialize(&merged)
            .await
            .map_err(|err| PluginError::Initialization {
                plugin_id: plugin_id.to_string(),
                cause: err.to_string(),
            })
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        lock_recover(&self.capabilities).contains_key(capability)
    }

    pub fn capability_owner(&self, capability: &str) -> Option<String> {
        lock_recover(&self.capabilities).get(capability).cloned()
    }

    pub fn has_plugin(&self, plugin_id: &str) -> bool {
        self.plugins.contains_key(plugin_id)
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn plugin_status(&self, plugin_id: &str) -> Option<PluginStatus> {
        self.statuses.get(plugin_id).copied()
    }

    pub fn plugin_config(&self, plugin_id: &str) -> Option<&toml::Table> {
        self.configs.get(plugin_id)
    }

    /// Plugin ids with status `active`, in registration order
    pub fn active_plugins(&self) -> Vec<String> {
        self.registration_order
            .iter()
            .filter(|id| self.statuses.get(*id) == Some(&PluginStatus::Active))
            .cloned()
            .collect()
    }

    pub fn phase(&self) -> RegistryPhase {
        self.phase
    }

    pub fn is_initialized(&self) -> bool {
        self.phase == RegistryPhase::Initialized
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Await every plugin's own asynchronous warm-up
    pub async fn plugins_ready(&self) -> PluginResult<()> {
        for plugin_id in &self.registration_order {
            if let Some(plugin) = self.plugins.get(plugin_id) {
                plugin.ready().await?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.registration_order)
            .field(
                "capabilities",
                &lock_recover(&self.capabilities)
                    .keys()
                    .collect::<Vec<_>>(),
            )
            .field("phase", &self.phase)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

/// Defaults first, caller-supplied entries override
fn merge_config(defaults: &toml::Table, overrides: &toml::Table) -> toml::Table {
    let mut merged = defaults.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Every default-config key must survive the merge
fn validate_config_keys(manifest: &PluginManifest, merged: &toml::Table) -> PluginResult<()> {
    for key in manifest.default_config.keys() {
        if !merged.contains_key(key) {
            return Err(PluginError::Configuration {
                plugin_id: manifest.id.clone(),
                message: format!("missing default config key: {}", key),
            });
        }
    }
    Ok(())
}
