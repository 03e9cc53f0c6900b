//! File acquisition
//!
//! Turns user-provided blobs into named byte buffers. Only the declared
//! media type is checked here; parsing happens in the operation that
//! consumes the buffer.

use crate::error::PdfToolsError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Media types the tools read or produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaType {
    Pdf,
    Docx,
    PlainText,
}

impl MediaType {
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            MediaType::PlainText => "text/plain",
        }
    }

    /// File extension including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Pdf => ".pdf",
            MediaType::Docx => ".docx",
            MediaType::PlainText => ".txt",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        // Browsers may append parameters, e.g. "text/plain;charset=utf-8"
        let essence = mime.split(';').next().unwrap_or("").trim();
        [MediaType::Pdf, MediaType::Docx, MediaType::PlainText]
            .into_iter()
            .find(|t| t.mime().eq_ignore_ascii_case(essence))
    }

    /// Infer the type from a file name when no MIME type was declared
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        [MediaType::Pdf, MediaType::Docx, MediaType::PlainText]
            .into_iter()
            .find(|t| lower.ends_with(t.extension()))
    }

    /// Name shown to users, e.g. "Word"
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Pdf => "PDF",
            MediaType::Docx => "Word",
            MediaType::PlainText => "text",
        }
    }
}

/// A file as handed over by the picker or a drop event
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    /// MIME type declared by the platform, empty when unknown
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes,
        }
    }

    /// Declared type, falling back to the extension when none was declared
    pub fn media_type(&self) -> Option<MediaType> {
        if self.declared_type.trim().is_empty() {
            MediaType::from_file_name(&self.name)
        } else {
            MediaType::from_mime(&self.declared_type)
        }
    }
}

/// One uploaded file accepted by a tool
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub name: String,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, media_type: MediaType, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Which files a tool accepts
#[derive(Debug, Clone)]
pub struct AcceptPolicy {
    pub accepted: Vec<MediaType>,
    pub multiple: bool,
}

impl AcceptPolicy {
    pub fn single(media_type: MediaType) -> Self {
        Self {
            accepted: vec![media_type],
            multiple: false,
        }
    }

    pub fn multiple(media_type: MediaType) -> Self {
        Self {
            accepted: vec![media_type],
            multiple: true,
        }
    }

    fn describe(&self) -> String {
        let labels: Vec<&str> = self.accepted.iter().map(|t| t.label()).collect();
        format!("Please upload {} files only", labels.join(" or "))
    }
}

impl Default for AcceptPolicy {
    fn default() -> Self {
        Self::multiple(MediaType::Pdf)
    }
}

/// Filter incoming files by media type
///
/// Files of other types are skipped. When nothing survives the filter the
/// whole drop is rejected with `InvalidFileType`. Single-file policies keep
/// the first accepted file only.
pub fn accept_files(
    files: Vec<IncomingFile>,
    policy: &AcceptPolicy,
) -> Result<Vec<SourceDocument>, PdfToolsError> {
    let received = files.len();

    let mut accepted: Vec<SourceDocument> = files
        .into_iter()
        .filter_map(|file| match file.media_type() {
            Some(t) if policy.accepted.contains(&t) => {
                Some(SourceDocument::new(file.name, t, file.bytes))
            }
            _ => {
                debug!(name = %file.name, declared = %file.declared_type, "skipping file");
                None
            }
        })
        .collect();

    if accepted.is_empty() {
        return Err(PdfToolsError::InvalidFileType(policy.describe()));
    }

    if !policy.multiple {
        accepted.truncate(1);
    }

    debug!(received, accepted = accepted.len(), "files acquired");
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(name: &str) -> IncomingFile {
        IncomingFile::new(name, "application/pdf", b"%PDF-1.7".to_vec())
    }

    #[test]
    fn test_accept_filters_by_declared_type() {
        let files = vec![
            pdf("a.pdf"),
            IncomingFile::new("photo.png", "image/png", vec![1, 2, 3]),
            pdf("b.pdf"),
        ];
        let accepted = accept_files(files, &AcceptPolicy::multiple(MediaType::Pdf)).unwrap();
        let names: Vec<_> = accepted.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_accept_rejects_when_nothing_matches() {
        let files = vec![IncomingFile::new("notes.txt", "text/plain", vec![])];
        let err = accept_files(files, &AcceptPolicy::multiple(MediaType::Pdf)).unwrap_err();
        assert!(matches!(err, PdfToolsError::InvalidFileType(_)));
        assert_eq!(err.to_string(), "Invalid file type: Please upload PDF files only");
    }

    #[test]
    fn test_accept_single_keeps_first() {
        let files = vec![pdf("first.pdf"), pdf("second.pdf")];
        let accepted = accept_files(files, &AcceptPolicy::single(MediaType::Pdf)).unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].name, "first.pdf");
    }

    #[test]
    fn test_missing_declared_type_falls_back_to_extension() {
        let file = IncomingFile::new("Report.DOCX", "", vec![]);
        assert_eq!(file.media_type(), Some(MediaType::Docx));
    }

    #[test]
    fn test_declared_type_wins_over_extension() {
        // A file named .pdf but declared as PNG is not a PDF
        let file = IncomingFile::new("fake.pdf", "image/png", vec![]);
        assert_eq!(file.media_type(), None);
    }

    #[test]
    fn test_mime_parameters_ignored() {
        assert_eq!(
            MediaType::from_mime("text/plain; charset=utf-8"),
            Some(MediaType::PlainText)
        );
    }
}
