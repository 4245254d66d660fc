//! Error types for the Menu PDF server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::pipeline::{OptionsError, PipelineError};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<OptionsError> for AppError {
    fn from(err: OptionsError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Pipeline(PipelineError::NoPagesFound | PipelineError::NoBoxesFound) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Pipeline(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message) = match &self {
            AppError::BadRequest(msg) => ("bad_request", msg.clone()),
            AppError::Pipeline(e) => (e.category(), public_message(e)),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("internal_error", "An internal error occurred".to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Client-facing text; `PdfPipeline::run` logs the full error
fn public_message(err: &PipelineError) -> String {
    match err {
        PipelineError::NoPagesFound | PipelineError::NoBoxesFound => err.to_string(),
        PipelineError::PageRenderFailed { index, .. } => format!("Rendering page {} failed", index + 1),
        PipelineError::DocumentLoadFailed(_) => "The source document could not be loaded".to_string(),
        PipelineError::EngineFailure(_) => "Rendering engine failure".to_string(),
        PipelineError::CompositionFailed(_) => "Failed to assemble final PDF".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::BadRequest("HTML content is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(PipelineError::NoPagesFound).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(PipelineError::NoBoxesFound).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(PipelineError::page(0, "boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(PipelineError::EngineFailure("crashed".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(PipelineError::document("timed out")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_engine_detail_stays_out_of_messages() {
        let cases = [
            (PipelineError::page(1, "Protocol error: Target closed"), "Rendering page 2 failed"),
            (
                PipelineError::document("Script error: ReferenceError: x is not defined"),
                "The source document could not be loaded",
            ),
            (
                PipelineError::EngineFailure("Browser launch failed: ws://127.0.0.1:9222".into()),
                "Rendering engine failure",
            ),
            (
                PipelineError::CompositionFailed("invalid xref at offset 912".into()),
                "Failed to assemble final PDF",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(public_message(&err), expected);
        }
        assert_eq!(
            public_message(&PipelineError::NoPagesFound),
            "No print pages found in the document"
        );
    }

    #[test]
    fn test_options_error_is_bad_request() {
        let err: AppError = OptionsError::UnknownFormat("B7".into()).into();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
