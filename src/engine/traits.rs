//! Rendering engine traits
//!
//! The pipeline only ever talks to the engine through these seams: launch a
//! shared engine, open one isolated context per page, load markup, measure
//! what was laid out, and print.

use std::time::Duration;

use async_trait::async_trait;

use super::EngineError;
use crate::config::MarkupConfig;
use crate::pipeline::{DocumentInspection, PageGeometry, PrintSettings, RenderCheck};

/// Starts a rendering engine for one request
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn RenderEngine>, EngineError>;
}

/// A running engine process shared by all pages of one request
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Open a fresh, isolated rendering context
    async fn open_context(&self) -> Result<Box<dyn RenderContext>, EngineError>;

    /// Terminate the engine process; further calls are no-ops
    async fn shutdown(&self) -> Result<(), EngineError>;
}

/// One isolated browsing context (a tab). Used for exactly one document.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Fix the layout viewport; must precede `load`
    async fn set_viewport(&self, geometry: &PageGeometry) -> Result<(), EngineError>;

    /// Replace the context's document with `html` and wait for navigation
    async fn load(&self, html: &str) -> Result<(), EngineError>;

    /// Resolve once no request has been in flight for `quiet`.
    ///
    /// Unbounded; callers wrap it in their load timeout.
    async fn await_network_idle(&self, quiet: Duration) -> Result<(), EngineError>;

    /// Resolve once every image has loaded or failed, each bounded by `per_image`
    async fn await_images(&self, per_image: Duration) -> Result<(), EngineError>;

    /// Force the print container, pages and canvases visible at fixed geometry
    async fn force_print_layout(
        &self,
        markup: &MarkupConfig,
        geometry: &PageGeometry,
    ) -> Result<(), EngineError>;

    /// Measure every page and box of the loaded document
    async fn inspect(&self, markup: &MarkupConfig) -> Result<DocumentInspection, EngineError>;

    /// Serialized page elements in document order
    async fn page_fragments(&self, markup: &MarkupConfig) -> Result<Vec<String>, EngineError>;

    /// Measure the leading `sample` boxes against the page bounds
    async fn render_check(
        &self,
        markup: &MarkupConfig,
        geometry: &PageGeometry,
        sample: usize,
    ) -> Result<RenderCheck, EngineError>;

    /// PNG snapshot; clipped to `clip` when given, full page otherwise
    async fn screenshot(&self, clip: Option<&PageGeometry>) -> Result<Vec<u8>, EngineError>;

    /// Print the loaded document to PDF
    async fn print_pdf(&self, settings: &PrintSettings) -> Result<Vec<u8>, EngineError>;

    /// Close the context
    async fn close(&self) -> Result<(), EngineError>;
}
