//! PDF utility operations
//!
//! This crate provides client-side PDF manipulation using lopdf: merge,
//! split, compress, conversion to and from text and Word, annotation
//! editing, and password protection. Tool controllers in [`controller`]
//! sequence these operations for a front end and hand the single output to
//! a [`delivery::DownloadSink`].

pub mod acquire;
pub mod apply_operations;
pub mod command;
pub mod compress;
pub mod controller;
pub mod delivery;
pub mod docx;
pub mod error;
pub mod inspect;
pub mod merge;
pub mod naming;
pub mod operations;
pub mod page_info;
pub mod progress;
pub mod protect;
pub mod split;
pub mod text;
pub mod word;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use acquire::{accept_files, AcceptPolicy, IncomingFile, MediaType, SourceDocument};
pub use command::{execute, ConversionFormat, ToolCommand, ToolOutput};
pub use compress::{compress_document, CompressionStats};
pub use controller::{FileEntry, Notification, Severity, ToolController, ToolKind, ToolState};
pub use delivery::{DownloadSink, MemorySink, OutputDocument};
pub use error::PdfToolsError;
pub use inspect::{quick_validate, validate_pdf, PdfInfo};
pub use merge::{merge_documents, MergeOptions};
pub use operations::{EditOperation, OperationLog, PdfRect, TextStyle};
pub use page_info::{PageInfo, PageOrientation};
pub use progress::{NoProgress, ProgressSink};
pub use protect::{authenticate, protect_document, unlock_document, AccessLevel, Credential, Permissions};
pub use split::{extract_pages, split_document};
pub use text::{convert_to_text, TextOptions};
pub use word::{convert_to_word, word_to_pdf};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfToolsError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| PdfToolsError::DocumentLoad(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Load a document the operations may rewrite
///
/// Rewriting an encrypted file mixes plaintext objects into ciphertext, so
/// protected documents are refused until they are unlocked.
pub(crate) fn load_unprotected(bytes: &[u8]) -> Result<lopdf::Document, PdfToolsError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| PdfToolsError::DocumentLoad(e.to_string()))?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(PdfToolsError::DocumentLoad(
            "PDF is password protected".into(),
        ));
    }
    Ok(doc)
}

/// Parse page range string like "1-3, 5, 8-10" into sorted unique page numbers
///
/// Blank input yields an empty list; callers decide whether that is an error.
pub fn parse_ranges(input: &str) -> Result<Vec<u32>, PdfToolsError> {
    parse_selection(input, None)
}

/// Like [`parse_ranges`], but every page must be at most `page_count`
///
/// The bound is checked before a range is expanded, so `"1-4294967295"`
/// fails immediately.
pub fn parse_ranges_bounded(input: &str, page_count: u32) -> Result<Vec<u32>, PdfToolsError> {
    parse_selection(input, Some(page_count))
}

fn parse_selection(input: &str, page_count: Option<u32>) -> Result<Vec<u32>, PdfToolsError> {
    use std::collections::BTreeSet;

    let check_bound = |last: u32, first: u32| match page_count {
        Some(max) if last > max => Err(PdfToolsError::InvalidRange(format!(
            "Page {} does not exist (document has {} pages)",
            first.max(max.saturating_add(1)),
            max
        ))),
        _ => Ok(()),
    };

    let mut pages = BTreeSet::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start
                .trim()
                .parse()
                .map_err(|_| PdfToolsError::InvalidRange(format!("Invalid start: {}", start)))?;
            let end: u32 = end
                .trim()
                .parse()
                .map_err(|_| PdfToolsError::InvalidRange(format!("Invalid end: {}", end)))?;

            if start > end {
                return Err(PdfToolsError::InvalidRange(format!(
                    "Start {} > end {}",
                    start, end
                )));
            }
            if start == 0 {
                return Err(PdfToolsError::InvalidRange("Pages start at 1".into()));
            }
            check_bound(end, start)?;

            pages.extend(start..=end);
        } else {
            let page: u32 = part
                .parse()
                .map_err(|_| PdfToolsError::InvalidRange(format!("Invalid page: {}", part)))?;
            if page == 0 {
                return Err(PdfToolsError::InvalidRange("Pages start at 1".into()));
            }
            check_bound(page, page)?;
            pages.insert(page);
        }
    }

    Ok(pages.into_iter().collect())
}
