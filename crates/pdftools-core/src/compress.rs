//! Lossless size reduction
//!
//! Drops unreachable objects and empty streams, then Flate-compresses every
//! stream that is still stored uncompressed. Images and fonts are left as they
//! are.

use crate::error::PdfToolsError;
use crate::progress::{Progress, ProgressSink};
use crate::load_unprotected;
use lopdf::xref::XrefType;
use serde::Serialize;
use tracing::info;

/// Input and output sizes of a compression run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionStats {
    pub original_size: usize,
    pub compressed_size: usize,
}

impl CompressionStats {
    /// Bytes saved; zero when the output grew
    pub fn saved_bytes(&self) -> usize {
        self.original_size.saturating_sub(self.compressed_size)
    }

    /// Saved share of the original size, in whole percent
    pub fn saved_percent(&self) -> u8 {
        if self.original_size == 0 {
            return 0;
        }
        (self.saved_bytes() * 100 / self.original_size) as u8
    }
}

pub fn compress_document(
    bytes: &[u8],
    progress: &mut dyn ProgressSink,
) -> Result<(Vec<u8>, CompressionStats), PdfToolsError> {
    let mut progress = Progress::start(progress);

    let mut doc = load_unprotected(bytes)?;
    progress.set(25);

    let pruned = doc.prune_objects().len();
    doc.delete_zero_length_streams();
    progress.set(50);

    doc.compress();
    // Object streams and XRef streams are not rewritten; write a classic table
    doc.reference_table.cross_reference_type = XrefType::CrossReferenceTable;
    progress.set(75);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfToolsError::Serialization(format!("Failed to save PDF: {}", e)))?;

    let stats = CompressionStats {
        original_size: bytes.len(),
        compressed_size: buffer.len(),
    };
    progress.finish();
    info!(
        original = stats.original_size,
        compressed = stats.compressed_size,
        pruned,
        "compressed PDF"
    );
    Ok((buffer, stats))
}
