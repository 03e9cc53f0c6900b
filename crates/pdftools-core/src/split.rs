//! PDF Split algorithm
//!
//! Extracts a page selection into a new document.

use crate::error::PdfToolsError;
use crate::{load_unprotected, parse_ranges_bounded};
use lopdf::Document;
use std::collections::HashSet;
use tracing::info;

/// Extract the pages named by a selection string such as `"1-3, 5"`
///
/// The selection is checked against the document's page count as it is
/// parsed.
pub fn split_document(bytes: &[u8], selection: &str) -> Result<Vec<u8>, PdfToolsError> {
    if selection.split(',').all(|part| part.trim().is_empty()) {
        return Err(PdfToolsError::Validation(
            "Please specify the page ranges to split".into(),
        ));
    }
    let doc = load_unprotected(bytes)?;
    let page_count = doc.get_pages().len() as u32;
    let pages = parse_ranges_bounded(selection, page_count)?;
    keep_pages(doc, &pages)
}

/// Extract only the specified pages (1-indexed)
///
/// Pages outside the selection are removed from the page tree and every
/// object no longer reachable from the trailer is dropped.
pub fn extract_pages(bytes: &[u8], pages: &[u32]) -> Result<Vec<u8>, PdfToolsError> {
    if pages.is_empty() {
        return Err(PdfToolsError::Validation("No pages specified".into()));
    }
    if pages.contains(&0) {
        return Err(PdfToolsError::InvalidRange(
            "Page numbers must be >= 1".into(),
        ));
    }
    keep_pages(load_unprotected(bytes)?, pages)
}

fn keep_pages(mut doc: Document, pages: &[u32]) -> Result<Vec<u8>, PdfToolsError> {
    let page_count = doc.get_pages().len() as u32;

    if let Some(&page) = pages.iter().find(|&&p| p > page_count) {
        return Err(PdfToolsError::InvalidRange(format!(
            "Page {} does not exist (document has {} pages)",
            page, page_count
        )));
    }

    let keep: HashSet<u32> = pages.iter().copied().collect();
    let to_delete: Vec<u32> = (1..=page_count).filter(|p| !keep.contains(p)).collect();

    if !to_delete.is_empty() {
        doc.delete_pages(&to_delete);
    }
    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfToolsError::Serialization(format!("Save failed: {}", e)))?;

    info!(
        kept = keep.len(),
        removed = to_delete.len(),
        size = buffer.len(),
        "split PDF"
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{create_test_pdf, page_text};
    use crate::protect::{protect_document, Credential};
    use pretty_assertions::assert_eq;
    use std::time::{Duration, Instant};

    #[test]
    fn test_split_empty_selection_is_validation_error() {
        let pdf = create_test_pdf(5, "Split");
        assert!(matches!(
            split_document(&pdf, "  "),
            Err(PdfToolsError::Validation(_))
        ));
    }

    #[test]
    fn test_split_malformed_selection_is_range_error() {
        let pdf = create_test_pdf(5, "Split");
        assert!(matches!(
            split_document(&pdf, "1-x"),
            Err(PdfToolsError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_split_extracts_selection_in_order() {
        let pdf = create_test_pdf(10, "Split");
        let result = split_document(&pdf, "8-9, 2").unwrap();

        let doc = Document::load_mem(&result).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
        assert_eq!(page_text(&result, 1), "Split-Page-2");
        assert_eq!(page_text(&result, 2), "Split-Page-8");
        assert_eq!(page_text(&result, 3), "Split-Page-9");
    }

    #[test]
    fn test_split_all_pages_keeps_everything() {
        let pdf = create_test_pdf(3, "All");
        let result = split_document(&pdf, "1-3").unwrap();
        let doc = Document::load_mem(&result).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn test_split_out_of_bounds_fails() {
        let pdf = create_test_pdf(5, "Split");
        assert!(matches!(
            extract_pages(&pdf, &[10]),
            Err(PdfToolsError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_split_page_zero_fails() {
        let pdf = create_test_pdf(5, "Split");
        assert!(matches!(
            extract_pages(&pdf, &[0]),
            Err(PdfToolsError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_split_invalid_pdf_is_load_error() {
        assert!(matches!(
            extract_pages(b"nope", &[1]),
            Err(PdfToolsError::DocumentLoad(_))
        ));
    }

    #[test]
    fn test_split_huge_range_fails_fast() {
        let pdf = create_test_pdf(3, "Split");
        let started = Instant::now();
        let result = split_document(&pdf, "1-4294967295");
        assert!(started.elapsed() < Duration::from_secs(2));
        match result {
            Err(PdfToolsError::InvalidRange(msg)) => {
                assert_eq!(msg, "Page 4 does not exist (document has 3 pages)")
            }
            other => panic!("expected InvalidRange, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_split_protected_pdf_is_refused() {
        let pdf = create_test_pdf(3, "Locked");
        let locked = protect_document(&pdf, &Credential::new("pw")).unwrap();
        assert!(matches!(
            split_document(&locked, "1"),
            Err(PdfToolsError::DocumentLoad(_))
        ));
        assert!(matches!(
            extract_pages(&locked, &[1]),
            Err(PdfToolsError::DocumentLoad(_))
        ));
    }
}
