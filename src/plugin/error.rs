//! Plugin Error Handling
//!
//! One variant per failure cause so callers discriminate programmatically
//! rather than by message text.

use crate::core::error_handling::ContextualError;
use crate::store::api::StoreError;

/// Result type alias for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PluginError {
    /// Registration rejected (destroyed registry, duplicate id, id mismatch,
    /// dependents still present)
    #[error("Plugin registration error: {message}")]
    Registration { message: String },

    /// Plugin not found in the registry
    #[error("Plugin not found: {plugin_id}")]
    PluginNotFound { plugin_id: String },

    /// Capability cycle in a registration batch
    #[error("Circular plugin dependency: {message}")]
    CircularDependency { message: String },

    /// Required capability absent at plugin-init time
    #[error("Required capability '{capability}' not available for plugin '{plugin_id}'")]
    CapabilityNotFound {
        plugin_id: String,
        capability: String,
    },

    /// Capability already claimed by another plugin
    #[error("Capability '{capability}' requested by '{claimant}' is already provided by '{owner}'")]
    CapabilityConflict {
        capability: String,
        owner: String,
        claimant: String,
    },

    /// A plugin's own initialization failed
    #[error("Plugin '{plugin_id}' failed to initialize: {cause}")]
    Initialization { plugin_id: String, cause: String },

    /// Malformed manifest or invalid configuration
    #[error("Plugin configuration error for '{plugin_id}': {message}")]
    Configuration { plugin_id: String, message: String },
}

impl From<StoreError> for PluginError {
    fn from(err: StoreError) -> Self {
        PluginError::Registration {
            message: err.to_string(),
        }
    }
}

impl ContextualError for PluginError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, PluginError::Configuration { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            PluginError::Configuration { message, .. } => Some(message),
            _ => None,
        }
    }
}
