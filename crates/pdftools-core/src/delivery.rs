//! Handing finished documents to the user

use crate::acquire::MediaType;
use crate::error::PdfToolsError;
use serde::Serialize;

/// The single result of a completed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDocument {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
    /// Suggested name for the saved file
    pub file_name: String,
}

impl OutputDocument {
    pub fn new(bytes: Vec<u8>, media_type: MediaType, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type,
            file_name: file_name.into(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Receives each finished document exactly once
pub trait DownloadSink {
    fn deliver(&mut self, output: &OutputDocument) -> Result<(), PdfToolsError>;
}

/// Keeps delivered documents in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub delivered: Vec<OutputDocument>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&OutputDocument> {
        self.delivered.last()
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&mut self, output: &OutputDocument) -> Result<(), PdfToolsError> {
        self.delivered.push(output.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_in_order() {
        let mut sink = MemorySink::new();
        sink.deliver(&OutputDocument::new(vec![1], MediaType::Pdf, "a.pdf"))
            .unwrap();
        sink.deliver(&OutputDocument::new(vec![2, 3], MediaType::PlainText, "b.txt"))
            .unwrap();

        assert_eq!(sink.delivered.len(), 2);
        assert_eq!(sink.last().map(|d| d.file_name.as_str()), Some("b.txt"));
        assert_eq!(sink.last().map(OutputDocument::size_bytes), Some(2));
    }

    #[test]
    fn test_serialized_output_omits_bytes() {
        let doc = OutputDocument::new(vec![0; 10], MediaType::Pdf, "x.pdf");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["fileName"], "x.pdf");
        assert!(json.get("bytes").is_none());
    }
}
