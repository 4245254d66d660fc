//! Pipeline error types
//!
//! Every variant is fatal for the request; nothing is retried.

use thiserror::Error;

use crate::engine::EngineError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document has no page markers
    #[error("No print pages found in the document")]
    NoPagesFound,

    /// Pages exist but none of them contains a content box
    #[error("Print pages found, but none contains content boxes")]
    NoBoxesFound,

    /// An isolated single-page render failed
    #[error("Rendering page {} failed: {reason}", .index + 1)]
    PageRenderFailed { index: usize, reason: String },

    /// The full document could not be loaded, inspected or split
    #[error("Loading the source document failed: {0}")]
    DocumentLoadFailed(String),

    /// The shared rendering engine failed to launch or crashed
    #[error("Rendering engine failure: {0}")]
    EngineFailure(String),

    /// A rendered page could not be merged into the final document
    #[error("Failed to assemble final PDF: {0}")]
    CompositionFailed(String),
}

impl PipelineError {
    /// Stable category label for error payloads
    pub fn category(&self) -> &'static str {
        match self {
            Self::NoPagesFound => "no_pages_found",
            Self::NoBoxesFound => "no_boxes_found",
            Self::PageRenderFailed { .. } => "page_render_failed",
            Self::DocumentLoadFailed(_) => "document_load_failed",
            Self::EngineFailure(_) => "engine_failure",
            Self::CompositionFailed(_) => "composition_failed",
        }
    }

    /// Wrap an engine error raised while rendering a given page
    pub fn page(index: usize, err: impl std::fmt::Display) -> Self {
        Self::PageRenderFailed {
            index,
            reason: err.to_string(),
        }
    }

    /// Wrap an engine error raised while preparing the full document
    pub fn document(err: impl std::fmt::Display) -> Self {
        Self::DocumentLoadFailed(err.to_string())
    }
}

impl From<EngineError> for PipelineError {
    fn from(err: EngineError) -> Self {
        PipelineError::EngineFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
