//! Stateful tool session
//!
//! Wraps a `ToolController` for one tool page. Every method that takes or
//! returns `JsValue` has an internal counterpart that native tests drive.

use crate::download::BrowserDownload;
use pdftools_core::progress::ProgressSink;
use pdftools_core::{
    ConversionFormat, DownloadSink, EditOperation, IncomingFile, Notification, OperationLog,
    Permissions, Severity, TextOptions, ToolController, ToolKind, ToolState,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Tool a session drives
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Merge,
    Split,
    Compress,
    Convert,
    Edit,
    Unlock,
}

impl From<Tool> for ToolKind {
    fn from(tool: Tool) -> Self {
        match tool {
            Tool::Merge => ToolKind::Merge,
            Tool::Split => ToolKind::Split,
            Tool::Compress => ToolKind::Compress,
            Tool::Convert => ToolKind::Convert,
            Tool::Edit => ToolKind::Edit,
            Tool::Unlock => ToolKind::Unlock,
        }
    }
}

/// Forwards percentages to the JS progress callback
struct JsProgress<'a> {
    callback: Option<&'a js_sys::Function>,
}

impl ProgressSink for JsProgress<'_> {
    fn report(&mut self, percent: u8) {
        if let Some(callback) = self.callback {
            let _ = callback.call1(&JsValue::null(), &JsValue::from(percent));
        }
    }
}

/// File list entry for JS serialization
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentInfoJs {
    name: String,
    size_bytes: usize,
    page_count: Option<u32>,
    selected: bool,
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
pub struct PdfToolsSession {
    controller: ToolController,
    progress_callback: Option<js_sys::Function>,
}

#[wasm_bindgen]
impl PdfToolsSession {
    #[wasm_bindgen(constructor)]
    pub fn new(tool: Tool) -> Self {
        Self {
            controller: ToolController::new(tool.into()),
            progress_callback: None,
        }
    }

    /// Callback signature: (percent: number) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: js_sys::Function) {
        self.progress_callback = Some(callback);
    }

    fn add_document_internal(&mut self, name: &str, mime_type: &str, bytes: &[u8]) -> Notification {
        self.controller
            .add_files(vec![IncomingFile::new(name, mime_type, bytes.to_vec())])
    }

    /// Add a picked or dropped file and return the resulting notification
    #[wasm_bindgen(js_name = addDocument)]
    pub fn add_document(
        &mut self,
        name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<JsValue, JsValue> {
        let notification = self.add_document_internal(name, mime_type, bytes);
        to_js(&notification)
    }

    #[wasm_bindgen(js_name = removeDocument)]
    pub fn remove_document(&mut self, index: usize) -> Result<(), JsValue> {
        if self.controller.remove_file(index) {
            Ok(())
        } else {
            Err(JsValue::from_str("Document index out of bounds"))
        }
    }

    #[wasm_bindgen(js_name = moveDocument)]
    pub fn move_document(&mut self, from: usize, to: usize) -> Result<(), JsValue> {
        if self.controller.move_file(from, to) {
            Ok(())
        } else {
            Err(JsValue::from_str("Document index out of bounds"))
        }
    }

    /// Returns the new selection flag
    #[wasm_bindgen(js_name = toggleSelection)]
    pub fn toggle_selection(&mut self, index: usize) -> Result<bool, JsValue> {
        self.controller
            .toggle_selection(index)
            .ok_or_else(|| JsValue::from_str("Document index out of bounds"))
    }

    #[wasm_bindgen(js_name = setReverseOrder)]
    pub fn set_reverse_order(&mut self, reverse: bool) {
        self.controller.set_reverse_order(reverse);
    }

    #[wasm_bindgen(js_name = setSelectedOnly)]
    pub fn set_selected_only(&mut self, selected_only: bool) {
        self.controller.set_selected_only(selected_only);
    }

    /// Input: "1-3, 5, 8-10" format
    #[wasm_bindgen(js_name = setPageSelection)]
    pub fn set_page_selection(&mut self, selection: &str) {
        self.controller.set_page_selection(selection);
    }

    #[wasm_bindgen(js_name = setPassword)]
    pub fn set_password(&mut self, password: &str) {
        self.controller.set_password(password);
    }

    /// An empty string means no separate owner password
    #[wasm_bindgen(js_name = setOwnerPassword)]
    pub fn set_owner_password(&mut self, owner_password: &str) {
        let owner_password = Some(owner_password.to_string()).filter(|p| !p.is_empty());
        self.controller.set_owner_password(owner_password);
    }

    #[wasm_bindgen(js_name = setPermissions)]
    pub fn set_permissions(&mut self, print: bool, modify: bool, copy: bool, annotate: bool) {
        self.controller.set_permissions(Permissions {
            print,
            modify,
            copy,
            annotate,
        });
    }

    fn set_format_internal(&mut self, format: &str) -> Result<(), String> {
        let format =
            ConversionFormat::parse(format).ok_or_else(|| format!("Unknown format: {}", format))?;
        self.controller.set_format(format);
        Ok(())
    }

    /// One of "text", "word", "wordToPdf", "protect"
    #[wasm_bindgen(js_name = setFormat)]
    pub fn set_format(&mut self, format: &str) -> Result<(), JsValue> {
        self.set_format_internal(format)
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = setIncludeContent)]
    pub fn set_include_content(&mut self, include_content: bool) {
        self.controller
            .set_text_options(TextOptions { include_content });
    }

    fn set_edit_operations_internal(&mut self, json: &str) -> Result<usize, String> {
        let operations: Vec<EditOperation> =
            serde_json::from_str(json).map_err(|e| format!("Invalid operations: {}", e))?;
        let mut log = OperationLog::new();
        for op in operations {
            log.add(op);
        }
        let count = log.len();
        self.controller.set_edit_log(log);
        Ok(count)
    }

    /// Replace the pending edits with a JSON array of operations
    #[wasm_bindgen(js_name = setEditOperations)]
    pub fn set_edit_operations(&mut self, json: &str) -> Result<usize, JsValue> {
        self.set_edit_operations_internal(json)
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = getDocumentInfos)]
    pub fn get_document_infos(&self) -> Result<JsValue, JsValue> {
        to_js(&self.document_infos())
    }

    fn document_infos(&self) -> Vec<DocumentInfoJs> {
        self.controller
            .files()
            .iter()
            .map(|f| DocumentInfoJs {
                name: f.source.name.clone(),
                size_bytes: f.source.size_bytes(),
                page_count: f.page_count,
                selected: f.selected,
            })
            .collect()
    }

    #[wasm_bindgen(js_name = getDocumentCount)]
    pub fn get_document_count(&self) -> usize {
        self.controller.files().len()
    }

    #[wasm_bindgen(js_name = getProgress)]
    pub fn get_progress(&self) -> u8 {
        self.controller.progress()
    }

    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        match self.controller.state() {
            ToolState::Idle => "idle",
            ToolState::Ready => "ready",
            ToolState::Processing => "processing",
            ToolState::Completed => "completed",
            ToolState::Failed => "failed",
        }
        .to_string()
    }

    #[wasm_bindgen(js_name = canExecute)]
    pub fn can_execute(&self) -> bool {
        self.controller.can_execute()
    }

    fn execute_with(
        &mut self,
        sink: &mut dyn DownloadSink,
        progress: &mut dyn ProgressSink,
    ) -> Notification {
        self.controller.execute(sink, progress)
    }

    /// Run the tool, start the download and return the notification
    pub fn execute(&mut self) -> Result<JsValue, JsValue> {
        let mut progress = JsProgress {
            callback: self.progress_callback.as_ref(),
        };
        let notification = self
            .controller
            .execute(&mut BrowserDownload::new(), &mut progress);

        if notification.severity == Severity::Destructive {
            web_sys::console::error_1(&JsValue::from_str(&format!(
                "{}: {}",
                notification.title, notification.description
            )));
        }
        to_js(&notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdftools_core::fixtures::{create_test_pdf, page_text};
    use pdftools_core::progress::NoProgress;
    use pdftools_core::MemorySink;
    use pretty_assertions::assert_eq;

    const PDF: &str = "application/pdf";

    #[test]
    fn test_new_session_is_empty() {
        let session = PdfToolsSession::new(Tool::Merge);
        assert_eq!(session.get_document_count(), 0);
        assert_eq!(session.get_state(), "idle");
        assert!(!session.can_execute());
    }

    #[test]
    fn test_merge_session_executes_in_list_order() {
        let mut session = PdfToolsSession::new(Tool::Merge);
        session.add_document_internal("a.pdf", PDF, &create_test_pdf(2, "a"));
        session.add_document_internal("b.pdf", PDF, &create_test_pdf(3, "b"));
        assert!(session.move_document(1, 0).is_ok());
        assert!(session.can_execute());

        let mut sink = MemorySink::new();
        let notification = session.execute_with(&mut sink, &mut NoProgress);
        assert!(notification.is_success());
        assert_eq!(session.get_state(), "completed");
        assert_eq!(session.get_progress(), 100);

        let merged = &sink.last().unwrap().bytes;
        assert_eq!(page_text(merged, 1), "b-Page-1");
        assert_eq!(page_text(merged, 5), "a-Page-2");
    }

    #[test]
    fn test_document_infos_report_page_counts() {
        let mut session = PdfToolsSession::new(Tool::Split);
        session.add_document_internal("doc.pdf", PDF, &create_test_pdf(4, "doc"));

        let infos = session.document_infos();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "doc.pdf");
        assert_eq!(infos[0].page_count, Some(4));
        assert!(infos[0].selected);
    }

    #[test]
    fn test_rejected_file_is_not_added() {
        let mut session = PdfToolsSession::new(Tool::Compress);
        let notification = session.add_document_internal("cat.png", "image/png", &[1, 2, 3]);
        assert_eq!(notification.severity, Severity::Destructive);
        assert_eq!(session.get_document_count(), 0);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let mut session = PdfToolsSession::new(Tool::Convert);
        assert!(session.set_format_internal("wordToPdf").is_ok());
        assert!(session.set_format_internal("epub").is_err());
    }

    #[test]
    fn test_edit_operations_from_json() {
        let mut session = PdfToolsSession::new(Tool::Edit);
        session.add_document_internal("form.pdf", PDF, &create_test_pdf(1, "form"));

        let json = r##"[
            {"type": "AddWhiteRect", "id": 7, "page": 1,
             "rect": {"x": 10.0, "y": 10.0, "width": 50.0, "height": 20.0}},
            {"type": "AddRectangle", "id": 7, "page": 1,
             "rect": {"x": 100.0, "y": 100.0, "width": 40.0, "height": 40.0},
             "stroke_color": "#FF0000", "fill_color": null}
        ]"##;
        assert_eq!(session.set_edit_operations_internal(json), Ok(2));
        assert!(session.set_edit_operations_internal("{").is_err());

        let mut sink = MemorySink::new();
        assert!(session.execute_with(&mut sink, &mut NoProgress).is_success());
        assert_eq!(sink.last().unwrap().file_name, "form_edited.pdf");
    }

    #[test]
    fn test_failed_run_reports_destructive() {
        let mut session = PdfToolsSession::new(Tool::Unlock);
        session.add_document_internal("open.pdf", PDF, &create_test_pdf(1, "open"));
        session.set_password("whatever");

        let mut sink = MemorySink::new();
        let notification = session.execute_with(&mut sink, &mut NoProgress);
        assert_eq!(notification.severity, Severity::Destructive);
        assert_eq!(session.get_state(), "failed");
        assert_eq!(session.get_progress(), 0);
        assert!(sink.delivered.is_empty());
    }
}
