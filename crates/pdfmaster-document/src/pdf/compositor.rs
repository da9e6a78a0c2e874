// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page compositor: merge an overlay's drawing operators and resources into
// an existing page, above or below its current content.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Object, Stream};
use pdfmaster_core::error::{PdfMasterError, Result};
use pdfmaster_core::types::ZOrder;
use tracing::{debug, instrument};

use super::store::{Page, PdfDocument};

/// Content to draw onto a page.
#[derive(Debug, Clone)]
pub struct Overlay {
    /// Content-stream operators.
    pub content: Vec<u8>,
    /// Resource mapping the operators draw from, keyed by category
    /// (`Font`, `ExtGState`, `XObject`, ...). Values must already belong to
    /// the target document.
    pub resources: Dictionary,
}

/// Which resource category each name-taking operator refers to.
fn operand_category(operator: &str) -> Option<&'static [u8]> {
    Some(match operator {
        "Tf" => b"Font",
        "Do" => b"XObject",
        "gs" => b"ExtGState",
        "cs" | "CS" => b"ColorSpace",
        "scn" | "SCN" => b"Pattern",
        "sh" => b"Shading",
        "BDC" | "DP" => b"Properties",
        _ => return None,
    })
}

/// Composite `overlay` onto `page` of `document`.
///
/// The page's effective resources (including inherited ones) become a direct
/// dictionary on the page. Overlay names that collide with a different page
/// resource are renamed (`F1` -> `F1_1`, ...) and the overlay's operators are
/// rewritten to match. Existing content is isolated in `q`/`Q` so its graphics
/// state cannot leak into the overlay. Page geometry is not touched.
#[instrument(skip_all, fields(page = page.index, ?z_order))]
pub fn composite(
    document: &mut PdfDocument,
    page: &Page,
    overlay: &Overlay,
    z_order: ZOrder,
) -> Result<()> {
    let fail = |reason: String| PdfMasterError::CompositeFailed {
        page: page.index + 1,
        reason,
    };

    let mut resources = effective_resources(document, page);
    let renames = merge_resources(&mut resources, &overlay.resources);

    let overlay_content = if renames.is_empty() {
        overlay.content.clone()
    } else {
        debug!(renamed = renames.len(), "Overlay resources renamed");
        rename_operands(&overlay.content, &renames).map_err(fail)?
    };

    let existing = content_references(document, page);

    let mut isolated = b"q\n".to_vec();
    isolated.extend_from_slice(&overlay_content);
    isolated.extend_from_slice(b"\nQ\n");
    let overlay_id = document.add_object(Stream::new(Dictionary::new(), isolated));
    let save_id = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = document.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    let mut contents = Vec::with_capacity(existing.len() + 3);
    if z_order == ZOrder::Below {
        contents.push(Object::Reference(overlay_id));
    }
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(restore_id));
    if z_order == ZOrder::Above {
        contents.push(Object::Reference(overlay_id));
    }

    let page_dict = document
        .as_lopdf_mut()
        .get_object_mut(page.id)
        .and_then(Object::as_dict_mut)
        .map_err(|err| fail(err.to_string()))?;
    page_dict.set("Contents", Object::Array(contents));
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok(())
}

/// The page's resources as a direct dictionary whose categories are direct
/// dictionaries too.
fn effective_resources(document: &PdfDocument, page: &Page) -> Dictionary {
    let Some(Object::Dictionary(inherited)) = document
        .inherited_attribute(page.id, b"Resources")
        .and_then(|object| document.resolve(object))
    else {
        return Dictionary::new();
    };

    let mut resources = Dictionary::new();
    for (category, value) in inherited.iter() {
        let value = match document.resolve(value) {
            Some(Object::Dictionary(entries)) => Object::Dictionary(entries.clone()),
            Some(other) => other.clone(),
            None => value.clone(),
        };
        resources.set(category.clone(), value);
    }
    resources
}

/// Merge `overlay` into `page`, returning `(category, old) -> new` renames.
fn merge_resources(
    page: &mut Dictionary,
    overlay: &Dictionary,
) -> HashMap<(Vec<u8>, Vec<u8>), Vec<u8>> {
    let mut renames = HashMap::new();

    for (category, entries) in overlay.iter() {
        let Object::Dictionary(entries) = entries else {
            // ProcSet and other non-dictionary categories carry no names.
            if !page.has(category) {
                page.set(category.clone(), entries.clone());
            }
            continue;
        };

        let mut target = match page.get(category) {
            Ok(Object::Dictionary(existing)) => existing.clone(),
            _ => Dictionary::new(),
        };

        for (name, value) in entries.iter() {
            let final_name = match target.get(name) {
                Err(_) => name.clone(),
                Ok(existing) if same_reference(existing, value) => continue,
                Ok(_) => {
                    let fresh = unused_name(&target, name);
                    renames.insert((category.clone(), name.clone()), fresh.clone());
                    fresh
                }
            };
            target.set(final_name, value.clone());
        }

        page.set(category.clone(), Object::Dictionary(target));
    }

    renames
}

fn same_reference(a: &Object, b: &Object) -> bool {
    matches!((a, b), (Object::Reference(x), Object::Reference(y)) if x == y)
}

fn unused_name(entries: &Dictionary, base: &[u8]) -> Vec<u8> {
    (1..)
        .map(|n| {
            let mut candidate = base.to_vec();
            candidate.extend_from_slice(format!("_{n}").as_bytes());
            candidate
        })
        .find(|candidate| !entries.has(candidate))
        .unwrap_or_else(|| base.to_vec())
}

/// Rewrite resource-name operands of `content` according to `renames`.
fn rename_operands(
    content: &[u8],
    renames: &HashMap<(Vec<u8>, Vec<u8>), Vec<u8>>,
) -> std::result::Result<Vec<u8>, String> {
    let mut decoded = Content::decode(content).map_err(|err| err.to_string())?;

    for operation in &mut decoded.operations {
        let Some(category) = operand_category(&operation.operator) else {
            continue;
        };
        for operand in &mut operation.operands {
            if let Object::Name(name) = operand {
                if let Some(new_name) = renames.get(&(category.to_vec(), name.clone())) {
                    *name = new_name.clone();
                }
            }
        }
    }

    decoded.encode().map_err(|err| err.to_string())
}

/// References (or inline streams promoted to objects) making up the page's
/// current content, in drawing order.
fn content_references(document: &mut PdfDocument, page: &Page) -> Vec<Object> {
    let contents = document
        .as_lopdf()
        .get_dictionary(page.id)
        .ok()
        .and_then(|dict| dict.get(b"Contents").ok())
        .cloned();

    let items = match contents {
        Some(Object::Reference(id)) => match document.as_lopdf().get_object(id) {
            // An indirect array of streams.
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        Some(Object::Array(items)) => items,
        Some(Object::Stream(stream)) => vec![Object::Stream(stream)],
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Object::Reference(_) => Some(item),
            Object::Stream(stream) => Some(Object::Reference(document.add_object(stream))),
            _ => None,
        })
        .collect()
}
