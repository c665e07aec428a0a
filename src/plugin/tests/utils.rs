//! Shared test utilities for plugin system tests

use crate::engine::{EngineTask, PdfEngine, PdfErrorReason};
use crate::plugin::api::{Plugin, PluginManifest, PluginPackage, PluginResult};
use crate::store::api::Action;
use crate::task::api::Task;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Engine whose warm-up task settles only when the test says so
pub struct ProbeEngine {
    init_task: Task<(), PdfErrorReason>,
    pub init_calls: AtomicUsize,
}

impl ProbeEngine {
    pub fn new() -> Self {
        let init_task = Task::new();
        init_task.resolve(());
        Self {
            init_task,
            init_calls: AtomicUsize::new(0),
        }
    }
}

impl PdfEngine for ProbeEngine {
    fn initialize(&self) -> Option<EngineTask<()>> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Some(self.init_task.clone())
    }

    fn render_page(
        &self,
        _document_id: &str,
        _page_index: usize,
        _options: &crate::engine::PageRenderOptions,
    ) -> EngineTask<Vec<u8>> {
        crate::task::api::resolved_task(Vec::new())
    }

    fn get_all_annotations(
        &self,
        _document_id: &str,
    ) -> EngineTask<Vec<crate::engine::AnnotationRecord>> {
        crate::task::api::resolved_task(Vec::new())
    }
}

/// Shared call journal so tests can assert lifecycle ordering
pub type Journal = Arc<std::sync::Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(std::sync::Mutex::new(Vec::new()))
}

pub fn record(journal: &Journal, entry: impl Into<String>) {
    journal.lock().unwrap().push(entry.into());
}

/// Configurable scripted plugin
pub struct ScriptedPlugin {
    id: String,
    journal: Journal,
    pub fail_initialize: bool,
    pub fail_post_initialize: bool,
}

impl ScriptedPlugin {
    pub fn new(id: &str, journal: Journal) -> Self {
        Self {
            id: id.to_string(),
            journal,
            fail_initialize: false,
            fail_post_initialize: false,
        }
    }
}

#[async_trait::async_trait]
impl Plugin for ScriptedPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    async fn initialize(&mut self, _config: &toml::Table) -> PluginResult<()> {
        record(&self.journal, format!("{}:initialize", self.id));
        if self.fail_initialize {
            return Err(crate::plugin::api::PluginError::Initialization {
                plugin_id: self.id.clone(),
                cause: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    async fn post_initialize(&mut self) -> PluginResult<()> {
        record(&self.journal, format!("{}:post_initialize", self.id));
        if self.fail_post_initialize {
            return Err(crate::plugin::api::PluginError::Initialization {
                plugin_id: self.id.clone(),
                cause: "scripted post failure".to_string(),
            });
        }
        Ok(())
    }

    async fn destroy(&mut self) -> PluginResult<()> {
        record(&self.journal, format!("{}:destroy", self.id));
        Ok(())
    }
}

/// Trivial slice every scripted plugin carries
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptedState {
    pub actions_seen: usize,
}

pub fn scripted_reducer(state: &ScriptedState, _action: &Action) -> ScriptedState {
    ScriptedState {
        actions_seen: state.actions_seen + 1,
    }
}

/// Package a scripted plugin with the given capability lists
pub fn scripted_package(
    id: &str,
    provides: &[&str],
    requires: &[&str],
    journal: &Journal,
) -> PluginPackage {
    let manifest = PluginManifest::new(id, id, "1.0.0")
        .with_provides(provides)
        .with_requires(requires);
    let plugin_id = id.to_string();
    let journal = journal.clone();
    PluginPackage::new(
        manifest,
        move |_context, _config| Ok(Box::new(ScriptedPlugin::new(&plugin_id, journal))),
        scripted_reducer,
        ScriptedState::default(),
    )
}

/// Same as `scripted_package` but the constructed plugin fails its own
/// `initialize`
pub fn failing_package(id: &str, provides: &[&str], journal: &Journal) -> PluginPackage {
    let manifest = PluginManifest::new(id, id, "1.0.0").with_provides(provides);
    let plugin_id = id.to_string();
    let journal = journal.clone();
    PluginPackage::new(
        manifest,
        move |_context, _config| {
            let mut plugin = ScriptedPlugin::new(&plugin_id, journal);
            plugin.fail_initialize = true;
            Ok(Box::new(plugin))
        },
        scripted_reducer,
        ScriptedState::default(),
    )
}
