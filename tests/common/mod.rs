//! Shared helpers for integration tests
#![allow(dead_code)]

use pdfviewer::plugin::api::{Plugin, PluginManifest, PluginPackage, PluginResult};
use pdfviewer::store::api::Action;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Minimal plugin whose lifecycle is observable from the outside
pub struct TrackedPlugin {
    id: String,
    pub initialized: Arc<AtomicBool>,
    pub destroyed: Arc<AtomicBool>,
}

impl TrackedPlugin {
    pub fn new(id: &str) -> (Self, Arc<AtomicBool>, Arc<AtomicBool>) {
        let initialized = Arc::new(AtomicBool::new(false));
        let destroyed = Arc::new(AtomicBool::new(false));
        (
            Self {
                id: id.to_string(),
                initialized: initialized.clone(),
                destroyed: destroyed.clone(),
            },
            initialized,
            destroyed,
        )
    }
}

#[async_trait::async_trait]
impl Plugin for TrackedPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    async fn initialize(&mut self, _config: &toml::Table) -> PluginResult<()> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&mut self) -> PluginResult<()> {
        self.destroyed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackedState {
    pub dispatches: usize,
}

pub fn tracked_reducer(state: &TrackedState, _action: &Action) -> TrackedState {
    TrackedState {
        dispatches: state.dispatches + 1,
    }
}

/// Package a tracked plugin with the given capability lists
pub fn tracked_package(id: &str, provides: &[&str], requires: &[&str]) -> PluginPackage {
    tracked_package_with_probes(id, provides, requires).0
}

/// Same, but exposes the lifecycle probes
pub fn tracked_package_with_probes(
    id: &str,
    provides: &[&str],
    requires: &[&str],
) -> (PluginPackage, Arc<AtomicBool>, Arc<AtomicBool>) {
    let manifest = PluginManifest::new(id, id, "1.0.0")
        .with_provides(provides)
        .with_requires(requires);
    let (plugin, initialized, destroyed) = TrackedPlugin::new(id);
    let package = PluginPackage::new(
        manifest,
        move |_context, _config| Ok(Box::new(plugin) as Box<dyn Plugin>),
        tracked_reducer,
        TrackedState::default(),
    );
    (package, initialized, destroyed)
}
