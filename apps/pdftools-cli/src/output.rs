//! Writes finished documents into a directory

use pdftools_core::{DownloadSink, OutputDocument, PdfToolsError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

/// Only the final path component of a suggested name is used
fn target_path(dir: &Path, file_name: &str) -> Result<PathBuf, PdfToolsError> {
    let name = Path::new(file_name)
        .file_name()
        .ok_or_else(|| PdfToolsError::Delivery(format!("Invalid file name: {}", file_name)))?;
    Ok(dir.join(name))
}

impl DownloadSink for DirectorySink {
    fn deliver(&mut self, output: &OutputDocument) -> Result<(), PdfToolsError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            PdfToolsError::Delivery(format!("Cannot create {}: {}", self.dir.display(), e))
        })?;

        let path = target_path(&self.dir, &output.file_name)?;
        // Write beside the target and rename so a failed write leaves nothing behind
        let partial = path.with_extension("part");
        fs::write(&partial, &output.bytes)
            .and_then(|()| fs::rename(&partial, &path))
            .map_err(|e| {
                let _ = fs::remove_file(&partial);
                PdfToolsError::Delivery(format!("Cannot write {}: {}", path.display(), e))
            })?;

        info!(path = %path.display(), size = output.size_bytes(), "wrote output");
        self.written.push(path);
        Ok(())
    }
}
