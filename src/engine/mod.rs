//! PDF Engine Collaborator Interface
//!
//! The registry and plugins depend only on the task contract of the engine;
//! parsing and rendering internals stay behind this trait. Every operation
//! answers with a [`Task`] so callers compose engine work with the same
//! combinators used everywhere else.

use crate::store::api::Rotation;
use crate::task::api::{resolved_task, Task};

/// Task specialization used for engine operations
pub type EngineTask<T> = Task<T, PdfErrorReason>;

/// Failure reasons surfaced by engine operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PdfErrorReason {
    #[error("document operation failed: {message}")]
    Operation { message: String },

    #[error("engine unavailable: {message}")]
    Unavailable { message: String },

    #[error("operation cancelled: {message}")]
    Cancelled { message: String },
}

impl crate::core::error_handling::ContextualError for PdfErrorReason {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}

/// Render request parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PageRenderOptions {
    pub scale: f64,
    pub rotation: Rotation,
}

impl Default for PageRenderOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotation: Rotation::Degree0,
        }
    }
}

/// Annotation payload as the engine reports it
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub id: String,
    pub page_index: usize,
    pub kind: String,
    pub payload: serde_json::Value,
}

/// Rendering/processing engine collaborator
pub trait PdfEngine: Send + Sync {
    /// Engine warm-up; `None` when no asynchronous setup is needed.
    /// The registry awaits this task at most once.
    fn initialize(&self) -> Option<EngineTask<()>> {
        None
    }

    /// Rasterize one page
    fn render_page(
        &self,
        document_id: &str,
        page_index: usize,
        options: &PageRenderOptions,
    ) -> EngineTask<Vec<u8>>;

    /// All annotations of a document
    fn get_all_annotations(&self, document_id: &str) -> EngineTask<Vec<AnnotationRecord>>;
}

/// Engine that answers everything synchronously with empty results
///
/// Useful for embedding the registry without a rendering backend and as a
/// test double.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEngine;

impl PdfEngine for NullEngine {
    fn render_page(
        &self,
        _document_id: &str,
        _page_index: usize,
        _options: &PageRenderOptions,
    ) -> EngineTask<Vec<u8>> {
        resolved_task(Vec::new())
    }

    fn get_all_annotations(&self, _document_id: &str) -> EngineTask<Vec<AnnotationRecord>> {
        resolved_task(Vec::new())
    }
}
