//! Page compositing using lopdf
//!
//! Merges single-page PDFs into one document. Object ids of each input are
//! shifted past everything already merged, so inputs never collide. The
//! output page tree lists pages in input order.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};

use super::error::{PipelineError, Result};
use super::types::{FinalDocument, RenderedPage};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed, cyclic `Parent` chains
const MAX_TREE_DEPTH: usize = 32;

/// Concatenate rendered pages, in the order given, into one PDF
pub fn compose(pages: &[RenderedPage], min_output_bytes: usize) -> Result<FinalDocument> {
    if pages.is_empty() {
        return Err(PipelineError::CompositionFailed(
            "no rendered pages to merge".to_string(),
        ));
    }

    let mut output = Document::with_version("1.7");
    let pages_id = output.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

    for (position, page) in pages.iter().enumerate() {
        if page.index != position {
            return Err(PipelineError::CompositionFailed(format!(
                "page {} arrived at position {}",
                page.index + 1,
                position + 1
            )));
        }

        let page_id = append_first_page(&mut output, pages_id, page)?;
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len();
    output.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(page_count as i64)),
        ])),
    );
    let catalog_id = output.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    output.trailer.set("Root", Object::Reference(catalog_id));

    let pruned = output.prune_objects();
    if !pruned.is_empty() {
        tracing::debug!("Pruned {} unreferenced objects", pruned.len());
    }

    let mut bytes = Vec::new();
    output
        .save_to(&mut bytes)
        .map_err(|e| PipelineError::CompositionFailed(format!("failed to write PDF: {}", e)))?;

    tracing::info!("Final PDF: {} pages, {} bytes", page_count, bytes.len());
    if bytes.len() < min_output_bytes {
        tracing::warn!(
            "Final PDF is only {} bytes (expected at least {}); it may be empty",
            bytes.len(),
            min_output_bytes
        );
    }

    Ok(FinalDocument { bytes, page_count })
}

/// Copy the first page of `page` and everything it references into `output`
fn append_first_page(
    output: &mut Document,
    pages_id: ObjectId,
    page: &RenderedPage,
) -> Result<ObjectId> {
    let unreadable = |e: lopdf::Error| {
        PipelineError::CompositionFailed(format!("page {} is not a readable PDF: {}", page.index + 1, e))
    };

    let mut source = Document::load_mem(&page.bytes).map_err(unreadable)?;
    source.renumber_objects_with(output.max_id + 1);

    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
    let first = *page_ids.first().ok_or_else(|| {
        PipelineError::CompositionFailed(format!("page {} rendered no pages", page.index + 1))
    })?;
    if page_ids.len() > 1 {
        tracing::warn!(
            "Page {} rendered {} pages; keeping the first",
            page.index + 1,
            page_ids.len()
        );
    }

    let mut page_dict = source.get_dictionary(first).map_err(unreadable)?.clone();
    inherit_attributes(&source, &mut page_dict);
    page_dict.set("Parent", Object::Reference(pages_id));

    let skipped: HashSet<ObjectId> = page_ids.iter().copied().collect();
    let max_id = source.max_id;
    for (id, object) in source.objects {
        if skipped.contains(&id) || is_structural(&object) {
            continue;
        }
        output.objects.insert(id, object);
    }
    output.objects.insert(first, Object::Dictionary(page_dict));
    output.max_id = output.max_id.max(max_id);

    Ok(first)
}

fn is_structural(object: &Object) -> bool {
    matches!(
        object.type_name().ok(),
        Some(b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline")
    )
}

/// Copy inheritable attributes down from the page tree onto the page itself
fn inherit_attributes(source: &Document, page: &mut Dictionary) {
    for &key in INHERITABLE {
        if page.has(key) {
            continue;
        }

        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut depth = 0;
        while let Some(node_id) = parent {
            depth += 1;
            if depth > MAX_TREE_DEPTH {
                break;
            }
            let Ok(node) = source.get_dictionary(node_id) else {
                break;
            };
            if let Ok(value) = node.get(key) {
                page.set(key.to_vec(), value.clone());
                break;
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
    }
}
