//! Page fragment isolation using lol_html
//!
//! A page element serialized out of the live document still carries whatever
//! inline styling hid or offset it there. Isolation forces the page root and
//! every content box visible so the fragment lays out on its own.

use lol_html::{element, rewrite_str, RewriteStrSettings, Selector};

use crate::config::MarkupConfig;

/// Inline declarations forced onto the page root
const PAGE_ROOT_STYLE: &[(&str, &str)] = &[
    ("display", "block"),
    ("visibility", "visible"),
    ("position", "relative"),
    ("top", "0"),
    ("left", "0"),
];

/// Inline declarations forced onto every content box
const CONTENT_BOX_STYLE: &[(&str, &str)] = &[
    ("display", "flex"),
    ("visibility", "visible"),
    ("opacity", "1"),
    ("position", "absolute"),
];

/// A page fragment ready to be embedded in a standalone document
#[derive(Debug, Clone, PartialEq)]
pub struct IsolatedFragment {
    pub markup: String,
    pub box_count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("HTML rewrite failed: {0}")]
    RewriteError(String),
}

fn checked_selector(selector: String) -> Result<String, MarkupError> {
    selector
        .parse::<Selector>()
        .map(|_| selector.clone())
        .map_err(|_| MarkupError::InvalidSelector(selector))
}

/// Force visibility onto a serialized page element and count its boxes
pub fn isolate_page(fragment: &str, markup: &MarkupConfig) -> Result<IsolatedFragment, MarkupError> {
    let page_selector = checked_selector(markup.page_selector())?;
    let box_selector = checked_selector(markup.box_selector())?;

    let mut root_seen = false;
    let mut box_count = 0usize;

    let html = rewrite_str(
        fragment,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(page_selector, |el| {
                    // Only the fragment root; nested markers are left alone
                    if !root_seen {
                        root_seen = true;
                        let style = force_inline_style(el.get_attribute("style").as_deref(), PAGE_ROOT_STYLE);
                        el.set_attribute("style", &style)?;
                    }
                    Ok(())
                }),
                element!(box_selector, |el| {
                    box_count += 1;
                    let style = force_inline_style(el.get_attribute("style").as_deref(), CONTENT_BOX_STYLE);
                    el.set_attribute("style", &style)?;
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| MarkupError::RewriteError(e.to_string()))?;

    Ok(IsolatedFragment {
        markup: html,
        box_count,
    })
}

/// Count elements carrying `class` in raw markup
pub fn count_marked(html: &str, class: &str) -> Result<usize, MarkupError> {
    let selector = checked_selector(MarkupConfig::selector(class))?;
    let mut count = 0usize;

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(selector, |_el| {
                count += 1;
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| MarkupError::RewriteError(e.to_string()))?;

    Ok(count)
}

/// Merge `forced` declarations over an inline style attribute.
///
/// Declarations for the forced properties are removed from `existing`; the
/// rest keep their order and the forced ones are appended.
pub fn force_inline_style(existing: Option<&str>, forced: &[(&str, &str)]) -> String {
    let mut declarations: Vec<String> = existing
        .map(split_declarations)
        .unwrap_or_default()
        .into_iter()
        .filter(|decl| {
            let property = decl
                .split_once(':')
                .map(|(p, _)| p.trim().to_ascii_lowercase())
                .unwrap_or_default();
            !forced.iter().any(|(name, _)| *name == property)
        })
        .collect();

    declarations.extend(forced.iter().map(|(name, value)| format!("{}: {}", name, value)));
    declarations.join("; ")
}

/// Split a declaration block on `;`, ignoring separators inside quotes or
/// parentheses (`url("data:image/png;base64,...")`)
fn split_declarations(style: &str) -> Vec<String> {
    let mut declarations = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in style.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                push_declaration(&mut declarations, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    push_declaration(&mut declarations, &current);

    declarations
}

fn push_declaration(declarations: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        declarations.push(trimmed.to_string());
    }
}
