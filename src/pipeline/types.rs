//! Pipeline data types
//!
//! The logical pages discovered in a submitted layout, the content boxes they
//! carry, and the PDF payloads produced for them.

use serde::{Deserialize, Serialize};

/// Fixed print geometry in CSS pixels at 96dpi
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

/// A4 portrait at 96dpi (210mm x 297mm)
pub const A4_PAGE: PageGeometry = PageGeometry {
    width: 794,
    height: 1123,
    device_scale_factor: 1.0,
};

impl PageGeometry {
    /// Whether a point lies inside the page
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width as f64 && y < self.height as f64
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        A4_PAGE
    }
}

/// The submitted markup, received once per request
#[derive(Debug, Clone)]
pub struct SourceDocument {
    html: String,
}

impl SourceDocument {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn len(&self) -> usize {
        self.html.len()
    }

    pub fn is_empty(&self) -> bool {
        self.html.trim().is_empty()
    }
}

/// One page-sized region of the source document
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalPage {
    /// 0-based position in document order; defines output order
    pub index: usize,
    /// Detached copy of the page element with visibility forced
    pub markup: String,
    /// Content boxes found in the fragment
    pub box_count: usize,
}

/// Content box kind, derived from its modifier class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxKind {
    Text,
    Image,
    #[serde(rename = "qrcode")]
    QrCode,
    #[serde(other)]
    Unknown,
}

impl Default for BoxKind {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Rendered bounding rectangle in viewport pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxGeometry {
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Computed visibility-related styles of a box
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxVisibility {
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub opacity: String,
    #[serde(default)]
    pub overflow: String,
}

/// A positioned element within a logical page, as measured by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBox {
    #[serde(default)]
    pub kind: BoxKind,
    pub geometry: BoxGeometry,
    #[serde(default)]
    pub style: BoxVisibility,
    #[serde(default)]
    pub in_viewport: bool,
}

impl ContentBox {
    /// A box counts as rendered when it occupies a non-empty area
    pub fn is_rendered(&self) -> bool {
        self.geometry.has_area()
    }
}

/// Measurements for one page element of a loaded document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInspection {
    pub index: usize,
    pub box_count: usize,
    #[serde(default)]
    pub boxes: Vec<ContentBox>,
}

/// Structural snapshot of a loaded document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInspection {
    pub page_count: usize,
    #[serde(default)]
    pub pages: Vec<PageInspection>,
}

impl DocumentInspection {
    pub fn total_boxes(&self) -> usize {
        self.pages.iter().map(|p| p.box_count).sum()
    }

    pub fn rendered_boxes(&self) -> impl Iterator<Item = &ContentBox> {
        self.pages
            .iter()
            .flat_map(|p| p.boxes.iter())
            .filter(|b| b.is_rendered())
    }
}

/// Box measurements taken inside an isolated single-page render
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderCheck {
    pub box_count: usize,
    /// Leading boxes, bounded by the configured sample size
    #[serde(default)]
    pub samples: Vec<ContentBox>,
}

/// Single-page PDF produced for one logical page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub index: usize,
    pub bytes: Vec<u8>,
    pub check: RenderCheck,
}

/// The merged multi-page artifact
#[derive(Debug, Clone)]
pub struct FinalDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl FinalDocument {
    pub const CONTENT_TYPE: &'static str = "application/pdf";
    pub const FILENAME: &'static str = "menu.pdf";

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
