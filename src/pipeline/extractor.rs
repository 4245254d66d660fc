//! Page extraction
//!
//! Pulls every page element out of the loaded document, in document order,
//! and isolates each one into a self-contained logical page.

use super::error::{PipelineError, Result};
use super::types::LogicalPage;
use crate::config::MarkupConfig;
use crate::engine::RenderContext;
use crate::markup::isolate_page;

/// Extract logical pages from a document already loaded in `context`
pub async fn extract_pages(
    context: &dyn RenderContext,
    markup: &MarkupConfig,
) -> Result<Vec<LogicalPage>> {
    let fragments = context
        .page_fragments(markup)
        .await
        .map_err(PipelineError::document)?;
    logical_pages(fragments, markup)
}

/// Isolate serialized page elements; position in `fragments` becomes the index
pub fn logical_pages(fragments: Vec<String>, markup: &MarkupConfig) -> Result<Vec<LogicalPage>> {
    if fragments.is_empty() {
        return Err(PipelineError::NoPagesFound);
    }

    fragments
        .into_iter()
        .enumerate()
        .map(|(index, fragment)| {
            let isolated = isolate_page(&fragment, markup).map_err(|e| PipelineError::page(index, e))?;
            tracing::debug!(
                "Page {}: {} content boxes, {} bytes of markup",
                index + 1,
                isolated.box_count,
                isolated.markup.len()
            );
            Ok(LogicalPage {
                index,
                markup: isolated.markup,
                box_count: isolated.box_count,
            })
        })
        .collect()
}
