//! Browser download delivery
//!
//! The finished buffer becomes a Blob behind a transient object URL. A
//! temporary anchor carrying the suggested file name is clicked and removed,
//! and the URL is revoked straight away.

use pdftools_core::{DownloadSink, OutputDocument, PdfToolsError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

#[derive(Debug, Default)]
pub struct BrowserDownload;

impl BrowserDownload {
    pub fn new() -> Self {
        Self
    }
}

fn js_error(context: &str, err: JsValue) -> PdfToolsError {
    let detail = err.as_string().unwrap_or_else(|| format!("{:?}", err));
    PdfToolsError::Delivery(format!("{}: {}", context, detail))
}

impl DownloadSink for BrowserDownload {
    fn deliver(&mut self, output: &OutputDocument) -> Result<(), PdfToolsError> {
        let window =
            web_sys::window().ok_or_else(|| PdfToolsError::Delivery("No window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| PdfToolsError::Delivery("No document".into()))?;

        let bytes = js_sys::Uint8Array::from(output.bytes.as_slice());
        let parts = js_sys::Array::of1(&bytes);
        let options = BlobPropertyBag::new();
        options.set_type(output.media_type.mime());
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .map_err(|e| js_error("Blob creation failed", e))?;

        let url = Url::create_object_url_with_blob(&blob)
            .map_err(|e| js_error("Object URL creation failed", e))?;

        let clicked = document
            .create_element("a")
            .map_err(|e| js_error("Anchor creation failed", e))
            .and_then(|element| {
                element
                    .dyn_into::<HtmlAnchorElement>()
                    .map_err(|_| PdfToolsError::Delivery("Element is not an anchor".into()))
            })
            .and_then(|anchor| {
                anchor.set_href(&url);
                anchor.set_download(&output.file_name);
                match document.body() {
                    Some(body) => {
                        body.append_child(&anchor)
                            .map_err(|e| js_error("Anchor insertion failed", e))?;
                        anchor.click();
                        anchor.remove();
                    }
                    None => anchor.click(),
                }
                Ok(())
            });

        // Revoke even when the anchor could not be used
        let _ = Url::revoke_object_url(&url);
        clicked
    }
}
