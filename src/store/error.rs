//! Store Error Types

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("No reducer registered for plugin: {plugin_id}")]
    UnknownPlugin { plugin_id: String },

    #[error("Reducer already registered for plugin: {plugin_id}")]
    DuplicateReducer { plugin_id: String },

    #[error("State slice for plugin '{plugin_id}' is not of the requested type")]
    SliceTypeMismatch { plugin_id: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
