//! Public API for the plugin system
//!
//! This module provides the complete public API for the plugin system.
//! External modules should import from here rather than directly from
//! internal modules.

pub use crate::plugin::base::PluginBase;
pub use crate::plugin::context::PluginContext;
pub use crate::plugin::error::{PluginError, PluginResult};
pub use crate::plugin::manifest::PluginManifest;
pub use crate::plugin::registration::{
    InitialSliceState, PluginFactory, PluginPackage, PluginRegistration,
};
pub use crate::plugin::registry::PluginRegistry;
pub use crate::plugin::resolver::DependencyResolver;
pub use crate::plugin::traits::Plugin;
pub use crate::plugin::types::{PluginStatus, RegistryPhase};
