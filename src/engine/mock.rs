//! Scripted engine for tests
//!
//! Serves a fixed set of pages, records every lifecycle call, and prints
//! real single-page PDFs so the compositor sees genuine input.

use std::future;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use parking_lot::Mutex;

use super::{EngineError, EngineLauncher, RenderContext, RenderEngine};
use crate::config::MarkupConfig;
use crate::pipeline::{
    BoxGeometry, BoxKind, ContentBox, DocumentInspection, PageGeometry, PageInspection,
    PrintSettings, RenderCheck,
};

/// One page element served by the mock
#[derive(Debug, Clone)]
pub struct MockPage {
    pub markup: String,
    pub boxes: Vec<ContentBox>,
}

impl MockPage {
    /// A page whose boxes are text boxes of the given sizes
    pub fn with_text_boxes(index: usize, sizes: &[(f64, f64)]) -> Self {
        let mut inner = String::new();
        let mut boxes = Vec::new();
        for (i, (width, height)) in sizes.iter().enumerate() {
            let top = 40.0 + i as f64 * 80.0;
            inner.push_str(&format!(
                r#"<div class="md-box md-box-text" data-box-id="b{index}-{i}" style="left: 40px; top: {top}px; width: {width}px; height: {height}px; display: none"><div class="md-box-editor">Item {i}</div></div>"#
            ));
            boxes.push(ContentBox {
                kind: BoxKind::Text,
                geometry: BoxGeometry { x: 40.0, y: top, width: *width, height: *height },
                in_viewport: true,
                ..Default::default()
            });
        }

        Self {
            markup: format!(
                r#"<div class="md-print-page" data-fixture="{index}" style="display: none; top: 2246px"><div class="md-canvas">{inner}</div></div>"#
            ),
            boxes,
        }
    }
}

/// What the mock serves and where it fails
#[derive(Debug, Clone, Default)]
pub struct MockScenario {
    pub pages: Vec<MockPage>,
    pub fail_launch: bool,
    pub fail_print_on: Option<usize>,
    pub stall_load_on: Option<usize>,
    /// Keep a request in flight forever on this page
    pub stall_network_on: Option<usize>,
    /// Never finish loading the full document
    pub stall_document_load: bool,
    pub stall_images: bool,
}

impl MockScenario {
    /// `count` pages with two 200x40 text boxes each
    pub fn text_pages(count: usize) -> Self {
        Self {
            pages: (0..count)
                .map(|i| MockPage::with_text_boxes(i, &[(200.0, 40.0), (200.0, 40.0)]))
                .collect(),
            ..Default::default()
        }
    }

    pub fn full_document(&self) -> String {
        let pages: String = self.pages.iter().map(|p| p.markup.as_str()).collect();
        format!(
            r#"<!DOCTYPE html><html><body><div class="md-print-pages-container" style="display: none">{pages}</div></body></html>"#
        )
    }
}

/// Lifecycle counters shared with the test
#[derive(Debug, Default)]
pub struct MockStats {
    pub launches: AtomicUsize,
    pub contexts_opened: AtomicUsize,
    pub contexts_closed: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub network_waits: AtomicUsize,
    pub loaded: Mutex<Vec<String>>,
}

impl MockStats {
    pub fn opened(&self) -> usize {
        self.contexts_opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.contexts_closed.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn network_waits(&self) -> usize {
        self.network_waits.load(Ordering::SeqCst)
    }
}

pub struct MockLauncher {
    scenario: Arc<MockScenario>,
    pub stats: Arc<MockStats>,
}

impl MockLauncher {
    pub fn new(scenario: MockScenario) -> Self {
        Self {
            scenario: Arc::new(scenario),
            stats: Arc::new(MockStats::default()),
        }
    }
}

#[async_trait]
impl EngineLauncher for MockLauncher {
    async fn launch(&self) -> Result<Box<dyn RenderEngine>, EngineError> {
        if self.scenario.fail_launch {
            return Err(EngineError::Launch("mock launch failure".to_string()));
        }
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockEngine {
            scenario: self.scenario.clone(),
            stats: self.stats.clone(),
        }))
    }
}

struct MockEngine {
    scenario: Arc<MockScenario>,
    stats: Arc<MockStats>,
}

#[async_trait]
impl RenderEngine for MockEngine {
    async fn open_context(&self) -> Result<Box<dyn RenderContext>, EngineError> {
        self.stats.contexts_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockContext {
            scenario: self.scenario.clone(),
            stats: self.stats.clone(),
            loaded: Mutex::new(None),
        }))
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        self.stats.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockContext {
    scenario: Arc<MockScenario>,
    stats: Arc<MockStats>,
    loaded: Mutex<Option<String>>,
}

impl MockContext {
    /// Fixture index of a single-page document, `None` for the full document
    fn page_index(&self) -> Option<usize> {
        let loaded = self.loaded.lock();
        let html = loaded.as_deref()?;
        let marker = "data-fixture=\"";
        if html.matches(marker).count() != 1 {
            return None;
        }
        let start = html.find(marker)? + marker.len();
        let end = html[start..].find('"')? + start;
        html[start..end].parse().ok()
    }
}

#[async_trait]
impl RenderContext for MockContext {
    async fn set_viewport(&self, _geometry: &PageGeometry) -> Result<(), EngineError> {
        Ok(())
    }

    async fn load(&self, html: &str) -> Result<(), EngineError> {
        *self.loaded.lock() = Some(html.to_string());
        self.stats.loaded.lock().push(html.to_string());
        let index = self.page_index();
        let stalled = match index {
            Some(_) => self.scenario.stall_load_on.is_some() && index == self.scenario.stall_load_on,
            None => self.scenario.stall_document_load,
        };
        if stalled {
            future::pending::<()>().await;
        }
        Ok(())
    }

    async fn await_network_idle(&self, _quiet: Duration) -> Result<(), EngineError> {
        self.stats.network_waits.fetch_add(1, Ordering::SeqCst);
        let index = self.page_index();
        if self.scenario.stall_network_on.is_some() && index == self.scenario.stall_network_on {
            future::pending::<()>().await;
        }
        Ok(())
    }

    async fn await_images(&self, _per_image: Duration) -> Result<(), EngineError> {
        if self.scenario.stall_images {
            future::pending::<()>().await;
        }
        Ok(())
    }

    async fn force_print_layout(
        &self,
        _markup: &MarkupConfig,
        _geometry: &PageGeometry,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    async fn inspect(&self, _markup: &MarkupConfig) -> Result<DocumentInspection, EngineError> {
        let pages: Vec<PageInspection> = self
            .scenario
            .pages
            .iter()
            .enumerate()
            .map(|(index, page)| PageInspection {
                index,
                box_count: page.boxes.len(),
                boxes: page.boxes.clone(),
            })
            .collect();
        Ok(DocumentInspection {
            page_count: pages.len(),
            pages,
        })
    }

    async fn page_fragments(&self, _markup: &MarkupConfig) -> Result<Vec<String>, EngineError> {
        Ok(self.scenario.pages.iter().map(|p| p.markup.clone()).collect())
    }

    async fn render_check(
        &self,
        _markup: &MarkupConfig,
        _geometry: &PageGeometry,
        sample: usize,
    ) -> Result<RenderCheck, EngineError> {
        let boxes = self
            .page_index()
            .and_then(|i| self.scenario.pages.get(i))
            .map(|p| p.boxes.clone())
            .unwrap_or_default();
        Ok(RenderCheck {
            box_count: boxes.len(),
            samples: boxes.into_iter().take(sample).collect(),
        })
    }

    async fn screenshot(&self, _clip: Option<&PageGeometry>) -> Result<Vec<u8>, EngineError> {
        Ok(checker_png())
    }

    async fn print_pdf(&self, settings: &PrintSettings) -> Result<Vec<u8>, EngineError> {
        let index = self
            .page_index()
            .ok_or_else(|| EngineError::Protocol("mock prints single pages only".to_string()))?;
        if self.scenario.fail_print_on == Some(index) {
            return Err(EngineError::Protocol(format!("mock print failure on page {}", index)));
        }
        Ok(single_page_pdf(
            &format!("page-{}", index),
            settings.paper_width * 72.0,
            settings.paper_height * 72.0,
        ))
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.stats.contexts_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 8x8 PNG, half black and half white
pub fn checker_png() -> Vec<u8> {
    let img = image::RgbImage::from_fn(8, 8, |x, _| {
        if x < 4 {
            image::Rgb([0, 0, 0])
        } else {
            image::Rgb([255, 255, 255])
        }
    });
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .expect("encode png");
    buffer
}

/// A one-page PDF whose content stream shows `label`, with an embedded
/// uncompressed image so the page has realistic weight
pub fn single_page_pdf(label: &str, width: f64, height: f64) -> Vec<u8> {
    multi_page_pdf(&[label], width, height)
}

/// A PDF with one page per label, page tree shaped like Chrome's output
pub fn multi_page_pdf(labels: &[&str], width: f64, height: f64) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let mut kids = Vec::new();
    for label in labels {
        let pixels: Vec<u8> = (0..32 * 32 * 3).map(|i| (i * 7 % 251) as u8).collect();
        let image_id = doc.add_object(Stream::new(
            Dictionary::from_iter([
                ("Type", Object::Name(b"XObject".to_vec())),
                ("Subtype", Object::Name(b"Image".to_vec())),
                ("Width", Object::Integer(32)),
                ("Height", Object::Integer(32)),
                ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
                ("BitsPerComponent", Object::Integer(8)),
            ]),
            pixels,
        ));

        let resources_id = doc.add_object(Dictionary::from_iter([
            (
                "Font",
                Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
            ),
            (
                "XObject",
                Object::Dictionary(Dictionary::from_iter([("Im1", Object::Reference(image_id))])),
            ),
        ]));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![64.into(), 0.into(), 0.into(), 64.into(), 40.into(), 40.into()],
                ),
                Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]),
                Operation::new("Q", vec![]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*label)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().expect("encode content"),
        ));

        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    // MediaBox lives on the page tree and is inherited by every page
    let pages = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(kids.len() as i64)),
        ("Kids", Object::Array(kids)),
        (
            "MediaBox",
            Object::Array(vec![0.into(), 0.into(), Object::Real(width as _), Object::Real(height as _)]),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).expect("save pdf");
    output
}
