//! PDF generation endpoint
//!
//! Accepts a paginated HTML layout and answers with one PDF page per print
//! page, in document order.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::pipeline::{FinalDocument, PdfOptions, SourceDocument};
use crate::state::AppState;

pub const PAGE_COUNT_HEADER: HeaderName = HeaderName::from_static("x-page-count");
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Generation request body
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub options: Option<PdfOptions>,
}

/// Both the legacy function path and the versioned API path
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generateMenuPDF", post(generate_pdf))
        .route("/api/v1/pdf/generate", post(generate_pdf))
}

/// Render the submitted HTML into a multi-page PDF
pub async fn generate_pdf(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let html = request.html.unwrap_or_default();
    let source = SourceDocument::new(html);
    if source.is_empty() {
        return Err(AppError::BadRequest("HTML content is required".to_string()));
    }
    let settings = request.options.unwrap_or_default().resolve()?;

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("generate_pdf", %request_id);

    let document = async {
        let _permit = state
            .acquire_job()
            .await
            .ok_or_else(|| AppError::Internal("generation queue closed".to_string()))?;
        tracing::debug!("Generation slot acquired ({} free)", state.available_jobs());

        state
            .pipeline()
            .run(&source, &settings)
            .await
            .map_err(AppError::from)
    }
    .instrument(span)
    .await?;

    Ok(pdf_response(document, request_id))
}

fn pdf_response(document: FinalDocument, request_id: Uuid) -> Response {
    (
        [
            (header::CONTENT_TYPE, FinalDocument::CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", FinalDocument::FILENAME),
            ),
            (PAGE_COUNT_HEADER, document.page_count.to_string()),
            (REQUEST_ID_HEADER, request_id.to_string()),
        ],
        Body::from(document.bytes),
    )
        .into_response()
}
