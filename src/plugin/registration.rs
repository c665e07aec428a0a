//! Plugin Packages and Registration Records
//!
//! A package bundles everything a plugin author produces: the manifest, a
//! factory constructing the instance, the slice reducer and the initial
//! slice state. Pairing a package with a per-registration config yields the
//! registration record the registry consumes during initialization.

use crate::plugin::context::PluginContext;
use crate::plugin::error::PluginResult;
use crate::plugin::manifest::PluginManifest;
use crate::plugin::traits::Plugin;
use crate::store::api::{Action, CoreState, StateSlice};
use crate::store::manager::SliceReducer;
use std::sync::Arc;

/// Constructs the plugin instance from the registry context and the merged
/// configuration
pub type PluginFactory =
    Box<dyn FnOnce(&PluginContext, &toml::Table) -> PluginResult<Box<dyn Plugin>> + Send>;

/// Initial slice state: a plain value, or derived from the core state and
/// the merged configuration at installation time
pub enum InitialSliceState {
    Value(Box<dyn StateSlice>),
    FromCore(Box<dyn FnOnce(&CoreState, &toml::Table) -> Box<dyn StateSlice> + Send>),
}

/// Everything a plugin author ships for one plugin
pub struct PluginPackage {
    pub manifest: PluginManifest,
    pub(crate) factory: PluginFactory,
    pub(crate) reducer: SliceReducer,
    pub(crate) initial_state: InitialSliceState,
}

impl PluginPackage {
    /// Package with a fixed initial slice state
    pub fn new<T: Clone + Send + 'static>(
        manifest: PluginManifest,
        factory: impl FnOnce(&PluginContext, &toml::Table) -> PluginResult<Box<dyn Plugin>>
            + Send
            + 'static,
        reducer: impl Fn(&T, &Action) -> T + Send + Sync + 'static,
        initial_state: T,
    ) -> Self {
        Self {
            manifest,
            factory: Box::new(factory),
            reducer: erase_reducer(reducer),
            initial_state: InitialSliceState::Value(Box::new(initial_state)),
        }
    }

    /// Package whose initial slice state is derived from the core state and
    /// the merged configuration
    pub fn with_initial_state_from_core<T: Clone + Send + 'static>(
        manifest: PluginManifest,
        factory: impl FnOnce(&PluginContext, &toml::Table) -> PluginResult<Box<dyn Plugin>>
            + Send
            + 'static,
        reducer: impl Fn(&T, &Action) -> T + Send + Sync + 'static,
        initial_state: impl FnOnce(&CoreState, &toml::Table) -> T + Send + 'static,
    ) -> Self {
        Self {
            manifest,
            factory: Box::new(factory),
            reducer: erase_reducer(reducer),
            initial_state: InitialSliceState::FromCore(Box::new(move |core, config| {
                Box::new(initial_state(core, config))
            })),
        }
    }

    /// Pair this package with a per-registration config
    pub fn into_registration(self, config: toml::Table) -> PluginRegistration {
        PluginRegistration {
            package: self,
            config,
        }
    }
}

impl std::fmt::Debug for PluginPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginPackage")
            .field("manifest", &self.manifest)
            .finish()
    }
}

fn erase_reducer<T: Clone + Send + 'static>(
    reducer: impl Fn(&T, &Action) -> T + Send + Sync + 'static,
) -> SliceReducer {
    Arc::new(
        move |slice: &dyn StateSlice, action: &Action| match slice.as_any().downcast_ref::<T>() {
            Some(state) => Box::new(reducer(state, action)),
            None => slice.clone_slice(),
        },
    )
}

/// One pending registration: a package plus its config, created at
/// `register_plugin` time and consumed during initialization
#[derive(Debug)]
pub struct PluginRegistration {
    pub(crate) package: PluginPackage,
    pub(crate) config: toml::Table,
}

impl PluginRegistration {
    pub fn plugin_id(&self) -> &str {
        &self.package.manifest.id
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.package.manifest
    }
}
