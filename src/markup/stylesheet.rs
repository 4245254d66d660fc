//! Render-time style contract
//!
//! Every isolated page is wrapped in the same standalone document. The
//! override stylesheet pins page and canvas geometry and forces content boxes
//! visible regardless of whatever cascade authored the source layout.

use crate::config::MarkupConfig;
use crate::pipeline::{LogicalPage, PageGeometry};

/// Bumped whenever the override rules change
pub const STYLE_CONTRACT_VERSION: u32 = 1;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="print-style-contract" content="__VERSION__">
  <style>
    @page {
      size: A4;
      margin: 0;
    }
    * {
      margin: 0;
      padding: 0;
      box-sizing: border-box;
    }
    body {
      width: __WIDTH__px;
      height: __HEIGHT__px;
      margin: 0;
      padding: 0;
      overflow: hidden;
      position: relative;
    }
    .__PAGE__,
    .__CANVAS__ {
      width: __WIDTH__px !important;
      height: __HEIGHT__px !important;
      display: block !important;
      visibility: visible !important;
      position: relative !important;
      margin: 0 !important;
      padding: 0 !important;
      top: 0 !important;
      left: 0 !important;
    }
    .__BOX__ {
      display: flex !important;
      visibility: visible !important;
      position: absolute !important;
      opacity: 1 !important;
    }
    .__EDITOR__ {
      display: block !important;
      visibility: visible !important;
      width: 100% !important;
      height: 100% !important;
      opacity: 1 !important;
    }
    .__IMAGE__,
    .__QRCODE__ {
      display: flex !important;
      visibility: visible !important;
      width: 100% !important;
      height: 100% !important;
      object-fit: contain !important;
      opacity: 1 !important;
    }
    .__BOX__ img {
      display: block !important;
      visibility: visible !important;
      max-width: 100% !important;
      height: auto !important;
      object-fit: contain !important;
      opacity: 1 !important;
    }
  </style>
</head>
<body>
__FRAGMENT__
</body>
</html>
"#;

/// Wrap one isolated page into a self-contained document
pub fn standalone_document(
    page: &LogicalPage,
    markup: &MarkupConfig,
    geometry: &PageGeometry,
) -> String {
    // Fragment last, so placeholder-like text inside it is never substituted
    TEMPLATE
        .replace("__VERSION__", &STYLE_CONTRACT_VERSION.to_string())
        .replace("__WIDTH__", &geometry.width.to_string())
        .replace("__HEIGHT__", &geometry.height.to_string())
        .replace("__PAGE__", &markup.page_class)
        .replace("__CANVAS__", &markup.canvas_class)
        .replace("__BOX__", &markup.box_class)
        .replace("__EDITOR__", &markup.editor_class)
        .replace("__IMAGE__", &markup.image_box_class)
        .replace("__QRCODE__", &markup.qrcode_box_class)
        .replace("__FRAGMENT__", &page.markup)
}
