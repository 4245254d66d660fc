//! Markup processing module
//!
//! Pure transforms over submitted and extracted HTML:
//! - Page fragment isolation (forced inline visibility, box counting)
//! - The standalone single-page document with its override stylesheet
//!
//! Uses lol_html for streaming HTML rewriting.

mod isolate;
mod stylesheet;

pub use isolate::{count_marked, force_inline_style, isolate_page, IsolatedFragment, MarkupError};
pub use stylesheet::{standalone_document, STYLE_CONTRACT_VERSION};
