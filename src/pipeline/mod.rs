//! HTML to multi-page PDF pipeline
//!
//! Turns a paginated HTML layout into one PDF page per logical page:
//! - Load the full document and verify its structure
//! - Extract each logical page and isolate it
//! - Render every page on its own, in a fresh context
//! - Merge the single-page outputs in document order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use menu_pdf_server::pipeline::{PdfPipeline, PdfOptions, SourceDocument};
//!
//! let pipeline = PdfPipeline::new(&config, launcher);
//! let settings = PdfOptions::default().resolve()?;
//! let document = pipeline.run(&SourceDocument::new(html), &settings).await?;
//! ```

pub mod compositor;
pub mod diagnostics;
mod error;
pub mod extractor;
mod options;
pub mod renderer;
mod types;
pub mod verifier;

use std::sync::Arc;

use tokio::time::sleep;

pub use error::{PipelineError, Result};
pub use options::{
    parse_css_length, Length, MarginOptions, Margins, OptionsError, PaperFormat, PdfOptions,
    PrintSettings,
};
pub use types::{
    BoxGeometry, BoxKind, BoxVisibility, ContentBox, DocumentInspection, FinalDocument,
    LogicalPage, PageGeometry, PageInspection, RenderCheck, RenderedPage, SourceDocument, A4_PAGE,
};

use crate::config::{Config, MarkupConfig, RenderConfig};
use crate::engine::{EngineError, EngineLauncher, RenderContext, RenderEngine};
use crate::markup::count_marked;
use renderer::{load_bounded, settle, PageRenderer};

/// Orchestrates one generation request end to end
#[derive(Clone)]
pub struct PdfPipeline {
    render: RenderConfig,
    markup: MarkupConfig,
    geometry: PageGeometry,
    launcher: Arc<dyn EngineLauncher>,
}

impl PdfPipeline {
    pub fn new(config: &Config, launcher: Arc<dyn EngineLauncher>) -> Self {
        Self {
            render: config.render.clone(),
            markup: config.markup.clone(),
            geometry: A4_PAGE,
            launcher,
        }
    }

    /// Produce the final document for `source`.
    ///
    /// One engine is launched per call and always shut down before returning.
    pub async fn run(&self, source: &SourceDocument, settings: &PrintSettings) -> Result<FinalDocument> {
        match count_marked(source.html(), &self.markup.page_class) {
            Ok(count) => tracing::info!(
                "Received {} bytes of HTML with {} page markers",
                source.len(),
                count
            ),
            Err(e) => tracing::debug!("Pre-flight marker count skipped: {}", e),
        }

        let engine = self
            .launcher
            .launch()
            .await
            .map_err(|e| PipelineError::EngineFailure(e.to_string()))?;
        tracing::debug!("Rendering engine launched");

        let result = self.run_with(engine.as_ref(), source, settings).await;

        if let Err(e) = engine.shutdown().await {
            tracing::warn!("Failed to shut down rendering engine: {}", e);
        }

        match &result {
            Ok(document) => tracing::info!(
                "Generated {} page PDF ({} bytes)",
                document.page_count,
                document.len()
            ),
            Err(e) => tracing::error!("PDF generation failed [{}]: {}", e.category(), e),
        }
        result
    }

    async fn run_with(
        &self,
        engine: &dyn RenderEngine,
        source: &SourceDocument,
        settings: &PrintSettings,
    ) -> Result<FinalDocument> {
        let pages = self.prepare(engine, source).await?;

        let renderer = PageRenderer::new(&self.render, &self.markup, self.geometry, settings);
        let mut rendered = Vec::with_capacity(pages.len());
        for page in &pages {
            tracing::info!(
                "Rendering page {}/{} ({} boxes)",
                page.index + 1,
                pages.len(),
                page.box_count
            );
            rendered.push(renderer.render(engine, page).await?);
        }

        compositor::compose(&rendered, self.render.min_output_bytes)
    }

    /// Load, verify and split the full document in its own context
    async fn prepare(&self, engine: &dyn RenderEngine, source: &SourceDocument) -> Result<Vec<LogicalPage>> {
        let context = engine.open_context().await?;
        let result = self.inspect_and_extract(context.as_ref(), source).await;
        if let Err(e) = context.close().await {
            tracing::warn!("Failed to close document context: {}", e);
        }
        result
    }

    async fn inspect_and_extract(
        &self,
        context: &dyn RenderContext,
        source: &SourceDocument,
    ) -> Result<Vec<LogicalPage>> {
        let fail = |e: EngineError| PipelineError::document(e);

        context.set_viewport(&self.geometry).await.map_err(fail)?;
        load_bounded(context, source.html(), &self.render)
            .await
            .map_err(fail)?;
        settle(context, &self.render).await.map_err(fail)?;

        context
            .force_print_layout(&self.markup, &self.geometry)
            .await
            .map_err(fail)?;
        sleep(self.render.style_settle_delay).await;

        let inspection = context.inspect(&self.markup).await.map_err(fail)?;
        let report = verifier::verify_document(&inspection)?;

        if self.render.diagnostic_screenshots {
            match context.screenshot(None).await {
                Ok(png) => diagnostics::report_snapshot("Document", &png),
                Err(e) => tracing::warn!("Document screenshot failed: {}", e),
            }
        }

        let pages = extractor::extract_pages(context, &self.markup).await?;
        if pages.len() != report.page_count {
            tracing::warn!(
                "Inspection saw {} pages but {} were extracted",
                report.page_count,
                pages.len()
            );
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{MockLauncher, MockPage, MockScenario};
    use std::time::Duration;

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.render.load_timeout = Duration::from_millis(200);
        config.render.image_timeout = Duration::from_millis(50);
        config.render.settle_delay = Duration::ZERO;
        config.render.style_settle_delay = Duration::ZERO;
        config
    }

    fn pipeline(scenario: MockScenario) -> (PdfPipeline, Arc<MockLauncher>) {
        let launcher = Arc::new(MockLauncher::new(scenario));
        (PdfPipeline::new(&fast_config(), launcher.clone()), launcher)
    }

    async fn run(pipeline: &PdfPipeline, scenario_html: String) -> Result<FinalDocument> {
        pipeline
            .run(&SourceDocument::new(scenario_html), &PrintSettings::default())
            .await
    }

    fn page_labels(bytes: &[u8]) -> Vec<String> {
        let doc = lopdf::Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|id| String::from_utf8_lossy(&doc.get_page_content(*id).unwrap()).into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_three_pages_in_order() {
        let scenario = MockScenario::text_pages(3);
        let html = scenario.full_document();
        let (pipeline, launcher) = pipeline(scenario);

        let document = run(&pipeline, html).await.unwrap();

        assert_eq!(document.page_count, 3);
        assert!(document.len() > 5_000);
        let labels = page_labels(&document.bytes);
        for (i, content) in labels.iter().enumerate() {
            assert!(content.contains(&format!("(page-{})", i)));
        }

        // One full-document context plus one per page
        assert_eq!(launcher.stats.opened(), 4);
        assert_eq!(launcher.stats.closed(), 4);
        assert_eq!(launcher.stats.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_each_page_loaded_alone() {
        let scenario = MockScenario::text_pages(2);
        let html = scenario.full_document();
        let (pipeline, launcher) = pipeline(scenario);

        run(&pipeline, html).await.unwrap();

        let loaded = launcher.stats.loaded.lock();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[1].matches("data-fixture=").count(), 1);
        assert!(loaded[1].contains(r#"data-fixture="0""#));
        assert!(loaded[2].contains(r#"data-fixture="1""#));
    }

    #[tokio::test]
    async fn test_no_pages() {
        let (pipeline, launcher) = pipeline(MockScenario::default());

        let err = run(&pipeline, "<p>Just a paragraph</p>".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::NoPagesFound));
        assert_eq!(launcher.stats.opened(), launcher.stats.closed());
        assert_eq!(launcher.stats.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_pages_without_boxes() {
        let scenario = MockScenario {
            pages: vec![MockPage::with_text_boxes(0, &[]), MockPage::with_text_boxes(1, &[])],
            ..Default::default()
        };
        let html = scenario.full_document();
        let (pipeline, launcher) = pipeline(scenario);

        let err = run(&pipeline, html).await.unwrap_err();

        assert!(matches!(err, PipelineError::NoBoxesFound));
        assert_eq!(launcher.stats.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_page_failure_aborts_and_cleans_up() {
        let mut scenario = MockScenario::text_pages(3);
        scenario.fail_print_on = Some(1);
        let html = scenario.full_document();
        let (pipeline, launcher) = pipeline(scenario);

        let err = run(&pipeline, html).await.unwrap_err();

        assert!(matches!(err, PipelineError::PageRenderFailed { index: 1, .. }));
        // Page 3 is never attempted
        assert_eq!(launcher.stats.opened(), 3);
        assert_eq!(launcher.stats.closed(), 3);
        assert_eq!(launcher.stats.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let scenario = MockScenario {
            fail_launch: true,
            ..MockScenario::text_pages(1)
        };
        let html = scenario.full_document();
        let (pipeline, launcher) = pipeline(scenario);

        let err = run(&pipeline, html).await.unwrap_err();

        assert!(matches!(err, PipelineError::EngineFailure(_)));
        assert_eq!(launcher.stats.opened(), 0);
        assert_eq!(launcher.stats.shutdowns(), 0);
    }

    #[tokio::test]
    async fn test_stalled_images_do_not_block() {
        let mut scenario = MockScenario::text_pages(2);
        scenario.stall_images = true;
        let html = scenario.full_document();
        let (pipeline, _launcher) = pipeline(scenario);

        let document = run(&pipeline, html).await.unwrap();
        assert_eq!(document.page_count, 2);
    }

    #[tokio::test]
    async fn test_stalled_page_load_fails_that_page() {
        let mut scenario = MockScenario::text_pages(2);
        scenario.stall_load_on = Some(1);
        let html = scenario.full_document();
        let (pipeline, launcher) = pipeline(scenario);

        let err = run(&pipeline, html).await.unwrap_err();

        assert!(matches!(err, PipelineError::PageRenderFailed { index: 1, .. }));
        assert_eq!(launcher.stats.opened(), launcher.stats.closed());
    }

    #[tokio::test]
    async fn test_stalled_document_load_is_a_document_failure() {
        let mut scenario = MockScenario::text_pages(2);
        scenario.stall_document_load = true;
        let html = scenario.full_document();
        let (pipeline, launcher) = pipeline(scenario);

        let err = run(&pipeline, html).await.unwrap_err();

        assert!(matches!(err, PipelineError::DocumentLoadFailed(_)));
        assert_eq!(err.category(), "document_load_failed");
        assert_eq!(launcher.stats.opened(), 1);
        assert_eq!(launcher.stats.closed(), 1);
        assert_eq!(launcher.stats.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_every_load_waits_for_network_idle() {
        let scenario = MockScenario::text_pages(3);
        let html = scenario.full_document();
        let (pipeline, launcher) = pipeline(scenario);

        run(&pipeline, html).await.unwrap();

        assert_eq!(launcher.stats.network_waits(), 4);
    }

    #[tokio::test]
    async fn test_busy_network_on_a_page_fails_that_page() {
        let mut scenario = MockScenario::text_pages(2);
        scenario.stall_network_on = Some(0);
        let html = scenario.full_document();
        let (pipeline, launcher) = pipeline(scenario);

        let err = run(&pipeline, html).await.unwrap_err();

        assert!(matches!(err, PipelineError::PageRenderFailed { index: 0, .. }));
        assert_eq!(launcher.stats.opened(), launcher.stats.closed());
        assert_eq!(launcher.stats.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_zero_area_boxes_still_render() {
        let scenario = MockScenario {
            pages: vec![MockPage::with_text_boxes(0, &[(0.0, 0.0)])],
            ..Default::default()
        };
        let html = scenario.full_document();
        let (pipeline, _launcher) = pipeline(scenario);

        let document = run(&pipeline, html).await.unwrap();
        assert_eq!(document.page_count, 1);
    }

    #[tokio::test]
    async fn test_same_input_same_pages() {
        let scenario = MockScenario::text_pages(2);
        let html = scenario.full_document();
        let (pipeline, launcher) = pipeline(scenario);

        let first = run(&pipeline, html.clone()).await.unwrap();
        let second = run(&pipeline, html).await.unwrap();

        assert_eq!(first.page_count, second.page_count);
        assert_eq!(page_labels(&first.bytes), page_labels(&second.bytes));
        assert_eq!(launcher.stats.shutdowns(), 2);
    }
}
