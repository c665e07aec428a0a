//! Interaction Manager Error Types

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InteractionError {
    #[error("Interaction mode not registered: {mode_id}")]
    ModeNotRegistered { mode_id: String },
}

/// Result type for interaction manager operations
pub type InteractionResult<T> = Result<T, InteractionError>;
