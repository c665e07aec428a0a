//! Plugin Trait System
//!
//! The lifecycle interface every plugin implements. All hooks other than
//! `id` are optional: the default implementations make a plugin with no
//! asynchronous setup, teardown or warm-up valid as-is.
//!
//! Lifecycle order, driven by the registry:
//! 1. construction (factory, after dependency resolution)
//! 2. `initialize(config)`, also re-invoked on configuration updates, so
//!    implementations must be reconfigurable
//! 3. `post_initialize()`, after every plugin in the registry initialized
//! 4. `destroy()`, on unregister or registry teardown

use crate::plugin::error::PluginResult;

#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
    /// Stable plugin identifier; must match the manifest id the plugin was
    /// registered under
    fn id(&self) -> &str;

    /// Initialize with the merged configuration
    async fn initialize(&mut self, _config: &toml::Table) -> PluginResult<()> {
        Ok(())
    }

    /// Runs once every plugin in the registry has initialized; failures are
    /// isolated to this plugin
    async fn post_initialize(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Release resources
    async fn destroy(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Completes once the plugin has finished its own asynchronous warm-up
    async fn ready(&self) -> PluginResult<()> {
        Ok(())
    }
}
