//! WASM bindings for the PDF tools
//!
//! Each tool page owns one `PdfToolsSession`. The session keeps the uploaded
//! files and the tool options in Rust memory, runs the operation and starts
//! the browser download itself. JavaScript only forwards DOM events and
//! renders the returned notification.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { PdfToolsSession, Tool } from './pkg/pdftools_wasm.js';
//!
//! await init();
//!
//! const session = new PdfToolsSession(Tool.Merge);
//! session.setProgressCallback((percent) => bar.value = percent);
//! session.addDocument("a.pdf", "application/pdf", bytesA);
//! session.addDocument("b.pdf", "application/pdf", bytesB);
//! session.moveDocument(1, 0);
//! const { title, description, severity } = session.execute();
//! ```

pub mod download;
pub mod session;

use wasm_bindgen::prelude::*;

pub use download::BrowserDownload;
pub use session::{PdfToolsSession, Tool};

/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Cheap structural check before a file is handed to a session
#[wasm_bindgen(js_name = quickValidate)]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    pdftools_core::quick_validate(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Page count, version, metadata and page sizes of a PDF
#[wasm_bindgen(js_name = getPdfInfo)]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info =
        pdftools_core::validate_pdf(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Format bytes as human-readable string
#[wasm_bindgen(js_name = formatBytes)]
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_version() {
        assert!(!get_version().is_empty());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(2621440), "2.5 MB");
    }
}
