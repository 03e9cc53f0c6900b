//! PDF validation and info extraction

use crate::error::PdfToolsError;
use crate::page_info::{page_infos, PageInfo};
use lopdf::{Dictionary, Document, Object};
use serde::Serialize;

/// PDF file information extracted during validation
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct PdfInfo {
    pub page_count: u32,
    /// Version from the file header (e.g. "1.7")
    pub version: String,
    pub encrypted: bool,
    pub size_bytes: usize,
    /// Document title from the Info dictionary; unavailable when encrypted
    pub title: Option<String>,
    pub author: Option<String>,
    pub pages: Vec<PageInfo>,
}

/// Validate a PDF file and extract basic info
pub fn validate_pdf(bytes: &[u8]) -> Result<PdfInfo, PdfToolsError> {
    quick_check_header(bytes)?;
    let version = extract_version(bytes);

    let document =
        Document::load_mem(bytes).map_err(|e| PdfToolsError::DocumentLoad(e.to_string()))?;
    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(PdfToolsError::DocumentLoad("PDF has no pages".into()));
    }

    let encrypted = document.trailer.get(b"Encrypt").is_ok();
    let (title, author) = if encrypted {
        (None, None)
    } else {
        extract_metadata(&document)
    };

    Ok(PdfInfo {
        page_count,
        version,
        encrypted,
        size_bytes: bytes.len(),
        title,
        author,
        pages: page_infos(&document)?,
    })
}

/// Quick validation without full parsing (for large files)
pub fn quick_validate(bytes: &[u8]) -> Result<(), PdfToolsError> {
    quick_check_header(bytes)?;

    let tail = &bytes[bytes.len().saturating_sub(1024)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(PdfToolsError::InvalidFileType(
            "PDF appears truncated (missing %%EOF marker)".into(),
        ));
    }
    Ok(())
}

fn quick_check_header(bytes: &[u8]) -> Result<(), PdfToolsError> {
    if bytes.len() < 8 {
        return Err(PdfToolsError::InvalidFileType(
            "File too small to be a valid PDF".into(),
        ));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(PdfToolsError::InvalidFileType(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }
    Ok(())
}

/// Header format: %PDF-1.7
fn extract_version(bytes: &[u8]) -> String {
    std::str::from_utf8(&bytes[5..8])
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|_| "1.4".to_string())
}

fn extract_metadata(document: &Document) -> (Option<String>, Option<String>) {
    let info = document
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .and_then(|id| document.get_dictionary(id));
    match info {
        Ok(info) => (info_string(info, b"Title"), info_string(info, b"Author")),
        Err(_) => (None, None),
    }
}

/// Text strings are UTF-16BE with a BOM, or PDFDocEncoding (read as Latin-1)
fn info_string(info: &Dictionary, key: &[u8]) -> Option<String> {
    let bytes = info.get(key).and_then(Object::as_str).ok()?;
    let decoded = match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    };
    let decoded = decoded.trim().to_string();
    (!decoded.is_empty()).then_some(decoded)
}
