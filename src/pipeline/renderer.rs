//! Single-page rendering
//!
//! Each logical page is printed from its own freshly opened context so no
//! layout state leaks from the full document or from earlier pages. The
//! context is closed whether the render succeeds or not.

use tokio::time::timeout;

use super::diagnostics;
use super::error::{PipelineError, Result};
use super::options::PrintSettings;
use super::types::{LogicalPage, PageGeometry, RenderedPage};
use super::verifier::{assess_render_check, report_render_check};
use crate::config::{MarkupConfig, RenderConfig};
use crate::engine::{EngineError, RenderContext, RenderEngine};
use crate::markup::standalone_document;

/// Renders logical pages into single-page PDFs
pub struct PageRenderer<'a> {
    render: &'a RenderConfig,
    markup: &'a MarkupConfig,
    geometry: PageGeometry,
    settings: &'a PrintSettings,
}

impl<'a> PageRenderer<'a> {
    pub fn new(
        render: &'a RenderConfig,
        markup: &'a MarkupConfig,
        geometry: PageGeometry,
        settings: &'a PrintSettings,
    ) -> Self {
        Self {
            render,
            markup,
            geometry,
            settings,
        }
    }

    /// Render one page in a fresh context
    pub async fn render(&self, engine: &dyn RenderEngine, page: &LogicalPage) -> Result<RenderedPage> {
        let html = standalone_document(page, self.markup, &self.geometry);
        tracing::debug!(
            "Page {}: standalone document is {} bytes",
            page.index + 1,
            html.len()
        );

        let context = engine
            .open_context()
            .await
            .map_err(|e| PipelineError::page(page.index, e))?;

        let result = self.render_in(context.as_ref(), page, &html).await;

        if let Err(e) = context.close().await {
            tracing::warn!("Failed to close context for page {}: {}", page.index + 1, e);
        }

        result
    }

    async fn render_in(
        &self,
        context: &dyn RenderContext,
        page: &LogicalPage,
        html: &str,
    ) -> Result<RenderedPage> {
        let index = page.index;
        let fail = |e: EngineError| PipelineError::page(index, e);

        context.set_viewport(&self.geometry).await.map_err(fail)?;
        load_bounded(context, html, self.render).await.map_err(fail)?;
        settle(context, self.render).await.map_err(fail)?;

        let check = context
            .render_check(self.markup, &self.geometry, self.render.sample_boxes)
            .await
            .map_err(fail)?;
        let assessment = assess_render_check(&check, &self.geometry);
        report_render_check(index, &assessment);
        if assessment.box_count != page.box_count {
            tracing::debug!(
                "Page {}: {} boxes extracted, {} found after render",
                index + 1,
                page.box_count,
                assessment.box_count
            );
        }

        if self.render.diagnostic_screenshots {
            match context.screenshot(Some(&self.geometry)).await {
                Ok(png) => diagnostics::report_snapshot(&format!("Page {}", index + 1), &png),
                Err(e) => tracing::warn!("Page {} screenshot failed: {}", index + 1, e),
            }
        }

        let bytes = context.print_pdf(self.settings).await.map_err(fail)?;
        tracing::info!("Page {} PDF generated: {} bytes", index + 1, bytes.len());

        Ok(RenderedPage { index, bytes, check })
    }
}

/// Load markup and wait for the network to go idle.
///
/// Both steps share `load_timeout`; running out of it is an error.
pub(crate) async fn load_bounded(
    context: &dyn RenderContext,
    html: &str,
    render: &RenderConfig,
) -> std::result::Result<(), EngineError> {
    let load = async {
        context.load(html).await?;
        context.await_network_idle(render.network_quiet).await
    };
    match timeout(render.load_timeout, load).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout(render.load_timeout.as_millis() as u64)),
    }
}

/// Wait for images, bounded, then give layout a grace period.
///
/// An image wait that runs out of time is logged and tolerated; script
/// errors are not.
pub(crate) async fn settle(
    context: &dyn RenderContext,
    render: &RenderConfig,
) -> std::result::Result<(), EngineError> {
    match timeout(render.image_timeout, context.await_images(render.image_timeout)).await {
        Ok(result) => result?,
        Err(_) => tracing::warn!(
            "Images still pending after {} ms, continuing",
            render.image_timeout.as_millis()
        ),
    }
    tokio::time::sleep(render.settle_delay).await;
    Ok(())
}
