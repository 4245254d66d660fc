//! Inspection scripts evaluated inside a loaded document
//!
//! Each builder returns a single JavaScript expression. Selectors and numbers
//! are spliced in as JSON literals so class names never need escaping.

use crate::config::MarkupConfig;
use crate::pipeline::PageGeometry;

/// Serializes a box's rect and computed style in the `ContentBox` JSON shape
const DESCRIBE_BOX: &str = r#"
const describeBox = (box, kinds, bounds) => {
  const rect = box.getBoundingClientRect();
  const computed = window.getComputedStyle(box);
  const kind = box.classList.contains(kinds.text) ? 'text'
    : box.classList.contains(kinds.image) ? 'image'
    : box.classList.contains(kinds.qrcode) ? 'qrcode'
    : 'unknown';
  return {
    kind,
    geometry: { x: rect.left, y: rect.top, width: rect.width, height: rect.height },
    style: {
      display: computed.display,
      visibility: computed.visibility,
      opacity: computed.opacity,
      overflow: computed.overflow,
    },
    inViewport: rect.top >= 0 && rect.left >= 0 && rect.top < bounds.height && rect.left < bounds.width,
  };
};
"#;

const AWAIT_IMAGES: &str = r#"
(() => Promise.all(Array.from(document.images).map((img) => {
  if (img.complete) {
    return Promise.resolve();
  }
  return new Promise((resolve) => {
    img.addEventListener('load', () => resolve(), { once: true });
    img.addEventListener('error', () => resolve(), { once: true });
    setTimeout(() => resolve(), __TIMEOUT__);
  });
}))
  .then(() => (document.fonts ? document.fonts.ready : null))
  .then(() => document.images.length))()
"#;

const FORCE_PRINT_LAYOUT: &str = r#"
(() => {
  const width = __WIDTH__ + 'px';
  const height = __HEIGHT__ + 'px';
  const container = document.querySelector(__CONTAINER__);
  if (container) {
    Object.assign(container.style, {
      display: 'block', visibility: 'visible', position: 'static',
      left: 'auto', top: 'auto', width: 'auto', height: 'auto',
      overflow: 'visible', zIndex: '1', opacity: '1',
    });
  }
  const pages = document.querySelectorAll(__PAGE__);
  pages.forEach((page) => {
    Object.assign(page.style, {
      display: 'block', visibility: 'visible', position: 'relative',
      width, height, margin: '0', padding: '0', overflow: 'visible', opacity: '1',
    });
    page.querySelectorAll(__CANVAS__).forEach((canvas) => {
      Object.assign(canvas.style, {
        width, height, minWidth: width, minHeight: height, maxWidth: width, maxHeight: height,
        display: 'block', visibility: 'visible', position: 'relative', overflow: 'visible',
        boxSizing: 'border-box', margin: '0', padding: '0',
      });
    });
  });
  return pages.length;
})()
"#;

const INSPECT: &str = r#"
(() => {
  __DESCRIBE_BOX__
  const kinds = __KINDS__;
  const bounds = { width: window.innerWidth, height: window.innerHeight };
  const pages = Array.from(document.querySelectorAll(__PAGE__)).map((page, index) => {
    const boxes = Array.from(page.querySelectorAll(__BOX__));
    return {
      index,
      boxCount: boxes.length,
      boxes: boxes.map((box) => describeBox(box, kinds, bounds)),
    };
  });
  return { pageCount: pages.length, pages };
})()
"#;

const PAGE_FRAGMENTS: &str = r#"
Array.from(document.querySelectorAll(__PAGE__)).map((page) => page.outerHTML)
"#;

const RENDER_CHECK: &str = r#"
(() => {
  __DESCRIBE_BOX__
  const kinds = __KINDS__;
  const bounds = { width: __WIDTH__, height: __HEIGHT__ };
  const boxes = Array.from(document.querySelectorAll(__BOX__));
  return {
    boxCount: boxes.length,
    samples: boxes.slice(0, __SAMPLE__).map((box) => describeBox(box, kinds, bounds)),
  };
})()
"#;

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn kinds_literal(markup: &MarkupConfig) -> String {
    serde_json::json!({
        "text": markup.text_box_class,
        "image": markup.image_box_class,
        "qrcode": markup.qrcode_box_class,
    })
    .to_string()
}

pub fn await_images(timeout_ms: u64) -> String {
    AWAIT_IMAGES.replace("__TIMEOUT__", &timeout_ms.to_string())
}

pub fn force_print_layout(markup: &MarkupConfig, geometry: &PageGeometry) -> String {
    FORCE_PRINT_LAYOUT
        .replace("__WIDTH__", &geometry.width.to_string())
        .replace("__HEIGHT__", &geometry.height.to_string())
        .replace("__CONTAINER__", &js_string(&MarkupConfig::selector(&markup.container_class)))
        .replace("__PAGE__", &js_string(&markup.page_selector()))
        .replace("__CANVAS__", &js_string(&MarkupConfig::selector(&markup.canvas_class)))
}

pub fn inspect(markup: &MarkupConfig) -> String {
    INSPECT
        .replace("__DESCRIBE_BOX__", DESCRIBE_BOX)
        .replace("__KINDS__", &kinds_literal(markup))
        .replace("__PAGE__", &js_string(&markup.page_selector()))
        .replace("__BOX__", &js_string(&markup.box_selector()))
}

pub fn page_fragments(markup: &MarkupConfig) -> String {
    PAGE_FRAGMENTS.replace("__PAGE__", &js_string(&markup.page_selector()))
}

pub fn render_check(markup: &MarkupConfig, geometry: &PageGeometry, sample: usize) -> String {
    RENDER_CHECK
        .replace("__DESCRIBE_BOX__", DESCRIBE_BOX)
        .replace("__KINDS__", &kinds_literal(markup))
        .replace("__WIDTH__", &geometry.width.to_string())
        .replace("__HEIGHT__", &geometry.height.to_string())
        .replace("__BOX__", &js_string(&markup.box_selector()))
        .replace("__SAMPLE__", &sample.to_string())
}
