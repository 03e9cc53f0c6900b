//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document.

use crate::error::PdfToolsError;
use crate::page_info::inherited_attribute;
use crate::progress::{Progress, ProgressSink};
use lopdf::{dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOptions {
    /// Append the inputs last-to-first
    #[serde(default)]
    pub reverse: bool,
}

/// Merge multiple PDFs into one
///
/// The algorithm:
/// 1. Require at least two inputs
/// 2. Create an empty destination with its own page tree
/// 3. For each source document, in order (or reversed):
///    a. Copy inherited page attributes onto each page
///    b. Import every object except the source catalog and page tree nodes,
///    with ids offset past the destination's highest id
///    c. Re-parent the imported pages under the destination page tree
/// 4. Drop unreachable objects, compress and return the merged result
pub fn merge_documents<B: AsRef<[u8]>>(
    documents: &[B],
    options: &MergeOptions,
    progress: &mut dyn ProgressSink,
) -> Result<Vec<u8>, PdfToolsError> {
    if documents.len() < 2 {
        return Err(PdfToolsError::Validation(
            "Please select at least 2 PDF files to merge".into(),
        ));
    }

    let order: Vec<usize> = if options.reverse {
        (0..documents.len()).rev().collect()
    } else {
        (0..documents.len()).collect()
    };

    let mut dest = Document::with_version("1.7");
    let pages_id = dest.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    let mut progress = Progress::start(progress);
    let total = order.len();

    for (step, &index) in order.iter().enumerate() {
        let source = Document::load_mem(documents[index].as_ref()).map_err(|e| {
            PdfToolsError::DocumentLoad(format!("Failed to load document {}: {}", index + 1, e))
        })?;
        if source.trailer.get(b"Encrypt").is_ok() {
            return Err(PdfToolsError::DocumentLoad(format!(
                "Document {} is password protected",
                index + 1
            )));
        }

        let page_ids = append_document(&mut dest, source, pages_id)?;
        debug!(document = index + 1, pages = page_ids.len(), "document appended");
        kids.extend(page_ids.into_iter().map(Object::Reference));

        progress.step(step + 1, total);
    }

    let page_count = kids.len();
    dest.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_count as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = dest.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    dest.trailer.set("Root", Object::Reference(catalog_id));

    dest.prune_objects();
    dest.compress();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer)
        .map_err(|e| PdfToolsError::Serialization(format!("Failed to save merged PDF: {}", e)))?;

    progress.finish();
    info!(
        documents = total,
        pages = page_count,
        size = buffer.len(),
        "merged PDFs"
    );
    Ok(buffer)
}

/// Import every page of `source` into `dest` and return the new page ids
/// in the source's page order
fn append_document(
    dest: &mut Document,
    mut source: Document,
    pages_id: ObjectId,
) -> Result<Vec<ObjectId>, PdfToolsError> {
    let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
    flatten_inherited_attributes(&mut source, &source_pages)?;

    let skipped = structural_objects(&source);
    let id_offset = dest.max_id;

    for (old_id, object) in source.objects.into_iter() {
        if skipped.contains(&old_id) {
            continue;
        }
        let new_id = (old_id.0 + id_offset, old_id.1);
        dest.objects.insert(new_id, remap_object_refs(object, id_offset));
    }
    dest.max_id = dest.max_id.max(source.max_id + id_offset);

    let mut page_ids = Vec::with_capacity(source_pages.len());
    for old_id in source_pages {
        let new_id = (old_id.0 + id_offset, old_id.1);
        match dest.objects.get_mut(&new_id) {
            Some(Object::Dictionary(page)) => page.set("Parent", Object::Reference(pages_id)),
            _ => {
                return Err(PdfToolsError::DocumentLoad(format!(
                    "Page object {} {} is not a dictionary",
                    old_id.0, old_id.1
                )))
            }
        }
        page_ids.push(new_id);
    }
    Ok(page_ids)
}

/// Copy attributes a page inherits from its ancestors onto the page itself,
/// so the page no longer depends on the source page tree
fn flatten_inherited_attributes(
    doc: &mut Document,
    page_ids: &[ObjectId],
) -> Result<(), PdfToolsError> {
    for &page_id in page_ids {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| PdfToolsError::DocumentLoad(e.to_string()))?;

        let inherited: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter(|key| page.get(key).is_err())
            .filter_map(|key| inherited_attribute(doc, page, key).map(|v| (*key, v.clone())))
            .collect();
        if inherited.is_empty() {
            continue;
        }

        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            for (key, value) in inherited {
                page.set(key.to_vec(), value);
            }
        }
    }
    Ok(())
}

/// The catalog and the page tree nodes; these are rebuilt in the destination
fn structural_objects(doc: &Document) -> BTreeSet<ObjectId> {
    let mut skipped = BTreeSet::new();
    if let Ok(root) = doc.trailer.get(b"Root").and_then(Object::as_reference) {
        skipped.insert(root);
    }
    for (id, object) in doc.objects.iter() {
        if let Object::Dictionary(dict) = object {
            if matches!(dict.get(b"Type").and_then(Object::as_name), Ok(b"Pages")) {
                skipped.insert(*id);
            }
        }
    }
    skipped
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}
