//! Plugin Manifest
//!
//! Static metadata describing a plugin's identity, version and capability
//! graph position. Capability names in `provides` are claimed during
//! initialization; `requires` must be satisfied before the plugin
//! constructs, `optional` merely influences load order.

use crate::plugin::error::{PluginError, PluginResult};

#[derive(Debug, Clone, PartialEq)]
pub struct PluginManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    pub provides: Vec<String>,
    pub requires: Vec<String>,
    pub optional: Vec<String>,
    pub default_config: toml::Table,
}

impl PluginManifest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            provides: Vec::new(),
            requires: Vec::new(),
            optional: Vec::new(),
            default_config: toml::Table::new(),
        }
    }

    pub fn with_provides(mut self, capabilities: &[&str]) -> Self {
        self.provides = capabilities.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_requires(mut self, capabilities: &[&str]) -> Self {
        self.requires = capabilities.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_optional(mut self, capabilities: &[&str]) -> Self {
        self.optional = capabilities.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_default_config(mut self, default_config: toml::Table) -> Self {
        self.default_config = default_config;
        self
    }

    /// Structural validation; runs before any registration side effect
    pub fn validate(&self) -> PluginResult<()> {
        for (field, value) in [
            ("id", &self.id),
            ("name", &self.name),
            ("version", &self.version),
        ] {
            if value.trim().is_empty() {
                return Err(PluginError::Configuration {
                    plugin_id: self.id.clone(),
                    message: format!("manifest field '{}' must not be empty", field),
                });
            }
        }
        Ok(())
    }

    /// Capabilities this plugin depends on, required first
    pub fn dependency_capabilities(&self) -> impl Iterator<Item = &str> {
        self.requires
            .iter()
            .chain(self.optional.iter())
            .map(String::as_str)
    }
}
