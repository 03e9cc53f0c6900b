//! Per-tool state machines
//!
//! A `ToolController` owns the files a tool is working on together with the
//! tool's options, runs at most one operation at a time and reports the
//! outcome as a `Notification`. It is the only place errors are caught: a
//! failed run resets progress, delivers nothing and returns a destructive
//! notification.

use crate::acquire::{accept_files, AcceptPolicy, IncomingFile, MediaType, SourceDocument};
use crate::command::{execute, ConversionFormat, ToolCommand, ToolOutput};
use crate::delivery::DownloadSink;
use crate::error::PdfToolsError;
use crate::merge::MergeOptions;
use crate::operations::OperationLog;
use crate::progress::ProgressSink;
use crate::protect::{Credential, Permissions};
use crate::text::TextOptions;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolKind {
    Merge,
    Split,
    Compress,
    Convert,
    Edit,
    Unlock,
}

impl ToolKind {
    pub fn accept_policy(&self) -> AcceptPolicy {
        match self {
            ToolKind::Merge => AcceptPolicy::multiple(MediaType::Pdf),
            ToolKind::Convert => AcceptPolicy {
                accepted: vec![MediaType::Pdf, MediaType::Docx],
                multiple: false,
            },
            _ => AcceptPolicy::single(MediaType::Pdf),
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            ToolKind::Merge => "Failed to merge PDFs. Please try again.",
            ToolKind::Split => "Failed to split PDF. Please try again.",
            ToolKind::Compress => "Failed to compress PDF. Please try again.",
            ToolKind::Convert => "Failed to convert file. Please try again.",
            ToolKind::Edit => "Failed to save changes. Please try again.",
            ToolKind::Unlock => "Failed to unlock PDF. Please try again.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolState {
    /// No files yet
    Idle,
    Ready,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Success,
    Destructive,
}

/// Outcome message for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Success,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Destructive,
        }
    }

    pub fn is_success(&self) -> bool {
        self.severity == Severity::Success
    }
}

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub source: SourceDocument,
    pub selected: bool,
    /// `None` for non-PDF files or PDFs that failed to parse
    pub page_count: Option<u32>,
}

impl FileEntry {
    fn new(source: SourceDocument) -> Self {
        let page_count = match source.media_type {
            MediaType::Pdf => match crate::get_page_count(&source.bytes) {
                Ok(count) => Some(count),
                Err(e) => {
                    warn!(name = %source.name, error = %e, "could not count pages");
                    None
                }
            },
            _ => None,
        };
        Self {
            source,
            selected: true,
            page_count,
        }
    }
}

/// Records the highest percentage seen while forwarding every update
struct TrackedProgress<'a> {
    inner: &'a mut dyn ProgressSink,
    latest: u8,
}

impl ProgressSink for TrackedProgress<'_> {
    fn report(&mut self, percent: u8) {
        self.latest = percent;
        self.inner.report(percent);
    }
}

pub struct ToolController {
    kind: ToolKind,
    files: Vec<FileEntry>,
    state: ToolState,
    progress: u8,
    merge_options: MergeOptions,
    selected_only: bool,
    credential: Credential,
    format: ConversionFormat,
    text_options: TextOptions,
    page_selection: String,
    edit_log: OperationLog,
}

impl ToolController {
    pub fn new(kind: ToolKind) -> Self {
        Self {
            kind,
            files: Vec::new(),
            state: ToolState::Idle,
            progress: 0,
            merge_options: MergeOptions::default(),
            selected_only: false,
            credential: Credential::new(""),
            format: ConversionFormat::default(),
            text_options: TextOptions::default(),
            page_selection: String::new(),
            edit_log: OperationLog::new(),
        }
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    pub fn state(&self) -> ToolState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Accept dropped or picked files
    ///
    /// Tools that work on one file replace the current file; merge appends.
    pub fn add_files(&mut self, files: Vec<IncomingFile>) -> Notification {
        let policy = self.kind.accept_policy();
        match accept_files(files, &policy) {
            Ok(accepted) => {
                if !policy.multiple {
                    self.files.clear();
                }
                let count = accepted.len();
                self.files.extend(accepted.into_iter().map(FileEntry::new));
                self.refresh_state();
                let label = if self.kind == ToolKind::Convert {
                    "file"
                } else {
                    "PDF file"
                };
                let plural = if count == 1 { "" } else { "s" };
                Notification::success(
                    "Files received",
                    format!("{} {}{} uploaded successfully", count, label, plural),
                )
            }
            Err(e) => Notification::destructive(e.title(), e.detail()),
        }
    }

    pub fn remove_file(&mut self, index: usize) -> bool {
        if index >= self.files.len() {
            return false;
        }
        self.files.remove(index);
        self.refresh_state();
        true
    }

    /// Move the file at `from` so that it ends up at `to`
    pub fn move_file(&mut self, from: usize, to: usize) -> bool {
        if from >= self.files.len() || to >= self.files.len() {
            return false;
        }
        let entry = self.files.remove(from);
        self.files.insert(to, entry);
        true
    }

    pub fn move_up(&mut self, index: usize) -> bool {
        index > 0 && self.move_file(index, index - 1)
    }

    pub fn move_down(&mut self, index: usize) -> bool {
        self.move_file(index, index + 1)
    }

    /// Flip a file's selection flag and return the new value
    pub fn toggle_selection(&mut self, index: usize) -> Option<bool> {
        let entry = self.files.get_mut(index)?;
        entry.selected = !entry.selected;
        Some(entry.selected)
    }

    pub fn set_reverse_order(&mut self, reverse: bool) {
        self.merge_options.reverse = reverse;
    }

    /// Merge only the files whose selection flag is set
    pub fn set_selected_only(&mut self, selected_only: bool) {
        self.selected_only = selected_only;
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.credential.user_password = password.into();
    }

    pub fn set_owner_password(&mut self, owner_password: Option<String>) {
        self.credential.owner_password = owner_password;
    }

    pub fn set_permissions(&mut self, permissions: Permissions) {
        self.credential.permissions = permissions;
    }

    pub fn set_format(&mut self, format: ConversionFormat) {
        self.format = format;
    }

    pub fn format(&self) -> ConversionFormat {
        self.format
    }

    pub fn set_text_options(&mut self, options: TextOptions) {
        self.text_options = options;
    }

    pub fn set_page_selection(&mut self, selection: impl Into<String>) {
        self.page_selection = selection.into();
    }

    pub fn set_edit_log(&mut self, log: OperationLog) {
        self.edit_log = log;
    }

    pub fn edit_log_mut(&mut self) -> &mut OperationLog {
        &mut self.edit_log
    }

    /// Whether `execute` would start an operation right now
    pub fn can_execute(&self) -> bool {
        if self.state == ToolState::Processing {
            return false;
        }
        let inputs = self.inputs().len();
        match self.kind {
            ToolKind::Merge => inputs >= 2,
            ToolKind::Split => inputs == 1 && !self.page_selection.trim().is_empty(),
            ToolKind::Convert if self.format == ConversionFormat::Protect => {
                inputs == 1 && !self.credential.user_password.is_empty()
            }
            ToolKind::Unlock => inputs == 1 && !self.credential.user_password.is_empty(),
            _ => inputs == 1,
        }
    }

    fn inputs(&self) -> Vec<&FileEntry> {
        self.files
            .iter()
            .filter(|f| !self.selected_only || f.selected)
            .collect()
    }

    fn command(&self) -> ToolCommand {
        match self.kind {
            ToolKind::Merge => ToolCommand::Merge {
                options: self.merge_options.clone(),
            },
            ToolKind::Split => ToolCommand::Split {
                pages: self.page_selection.clone(),
            },
            ToolKind::Compress => ToolCommand::Compress,
            ToolKind::Convert => self.format.command(&self.text_options, &self.credential),
            ToolKind::Edit => ToolCommand::Edit {
                log: self.edit_log.clone(),
            },
            ToolKind::Unlock => ToolCommand::Unlock {
                password: self.credential.user_password.clone(),
            },
        }
    }

    /// Run the tool's operation and deliver its output
    pub fn execute(
        &mut self,
        sink: &mut dyn DownloadSink,
        progress: &mut dyn ProgressSink,
    ) -> Notification {
        if self.state == ToolState::Processing {
            let err = PdfToolsError::Validation("An operation is already in progress".into());
            return Notification::destructive(err.title(), err.detail());
        }

        let command = self.command();
        let inputs: Vec<SourceDocument> =
            self.inputs().into_iter().map(|f| f.source.clone()).collect();

        self.state = ToolState::Processing;
        self.progress = 0;

        let mut tracked = TrackedProgress {
            inner: progress,
            latest: 0,
        };
        let result = execute(&command, &inputs, &mut tracked)
            .and_then(|output| sink.deliver(&output.document).map(|()| output));

        match result {
            Ok(output) => {
                self.state = ToolState::Completed;
                self.progress = 100;
                info!(
                    tool = ?self.kind,
                    file = %output.document.file_name,
                    size = output.document.size_bytes(),
                    "operation completed"
                );
                self.success_notification(&output)
            }
            Err(e) => {
                self.state = ToolState::Failed;
                self.progress = 0;
                progress_reset(&mut tracked);
                warn!(tool = ?self.kind, error = %e, "operation failed");
                self.failure_notification(&e)
            }
        }
    }

    fn refresh_state(&mut self) {
        if self.state != ToolState::Processing {
            self.state = if self.files.is_empty() {
                ToolState::Idle
            } else {
                ToolState::Ready
            };
        }
    }

    fn success_notification(&self, output: &ToolOutput) -> Notification {
        match self.kind {
            ToolKind::Merge => Notification::success("Success", "PDFs merged successfully!"),
            ToolKind::Split => {
                Notification::success("PDF Split", "Successfully split PDF into specified ranges")
            }
            ToolKind::Compress => match output.compression {
                Some(stats) if stats.saved_bytes() > 0 => Notification::success(
                    "PDF Compressed",
                    format!(
                        "Successfully compressed PDF file ({}% smaller)",
                        stats.saved_percent()
                    ),
                ),
                _ => Notification::success("PDF Compressed", "Successfully compressed PDF file"),
            },
            ToolKind::Convert => Notification::success(
                "PDF Converted",
                format!(
                    "Successfully converted {} to {}",
                    self.format.input_type().label(),
                    self.format.label()
                ),
            ),
            ToolKind::Edit => {
                Notification::success("Changes Saved", "Your PDF has been updated successfully")
            }
            ToolKind::Unlock => {
                Notification::success("PDF Unlocked", "Password removed successfully")
            }
        }
    }

    fn failure_notification(&self, err: &PdfToolsError) -> Notification {
        match (self.kind, err) {
            (ToolKind::Merge, PdfToolsError::Validation(msg)) => {
                Notification::destructive("Not enough files", msg.as_str())
            }
            (ToolKind::Split, PdfToolsError::Validation(msg)) => {
                Notification::destructive("Missing page ranges", msg.as_str())
            }
            (_, PdfToolsError::DocumentLoad(_))
            | (_, PdfToolsError::Serialization(_))
            | (_, PdfToolsError::Conversion(_))
            | (_, PdfToolsError::Delivery(_)) => {
                Notification::destructive(err.title(), self.kind.failure_message())
            }
            _ => Notification::destructive(err.title(), err.detail()),
        }
    }
}

/// A failed run ends at 0 for anyone watching progress
fn progress_reset(tracked: &mut TrackedProgress<'_>) {
    if tracked.latest != 0 {
        tracked.report(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{MemorySink, OutputDocument};
    use crate::fixtures::{create_test_docx, create_test_pdf, page_text};
    use crate::operations::{EditOperation, PdfRect};
    use crate::progress::NoProgress;
    use pretty_assertions::assert_eq;

    fn pdf_file(name: &str, pages: u32) -> IncomingFile {
        let prefix = name.trim_end_matches(".pdf");
        IncomingFile::new(name, "application/pdf", create_test_pdf(pages, prefix))
    }

    /// Sink that always fails
    struct BrokenSink;

    impl DownloadSink for BrokenSink {
        fn deliver(&mut self, _output: &OutputDocument) -> Result<(), PdfToolsError> {
            Err(PdfToolsError::Delivery("disk full".into()))
        }
    }

    #[test]
    fn test_merge_two_files_delivers_combined_pdf() {
        let mut tool = ToolController::new(ToolKind::Merge);
        let note = tool.add_files(vec![pdf_file("a.pdf", 2), pdf_file("b.pdf", 3)]);
        assert_eq!(note.description, "2 PDF files uploaded successfully");
        assert_eq!(tool.state(), ToolState::Ready);
        assert!(tool.can_execute());

        let mut sink = MemorySink::new();
        let note = tool.execute(&mut sink, &mut NoProgress);
        assert_eq!(note, Notification::success("Success", "PDFs merged successfully!"));
        assert_eq!(tool.state(), ToolState::Completed);
        assert_eq!(tool.progress(), 100);

        let output = sink.last().unwrap();
        assert_eq!(output.file_name, "merged.pdf");
        assert_eq!(crate::get_page_count(&output.bytes).unwrap(), 5);
        assert_eq!(page_text(&output.bytes, 5), "b-Page-3");
    }

    #[test]
    fn test_merge_with_one_selected_file_fails_without_delivery() {
        let mut tool = ToolController::new(ToolKind::Merge);
        tool.add_files(vec![pdf_file("a.pdf", 1), pdf_file("b.pdf", 1)]);
        tool.set_selected_only(true);
        assert_eq!(tool.toggle_selection(1), Some(false));
        assert!(!tool.can_execute());

        let mut sink = MemorySink::new();
        let mut seen = Vec::new();
        let mut progress = |p: u8| seen.push(p);
        let note = tool.execute(&mut sink, &mut progress);

        assert_eq!(note.severity, Severity::Destructive);
        assert_eq!(note.title, "Not enough files");
        assert_eq!(note.description, "Please select at least 2 PDF files to merge");
        assert!(sink.delivered.is_empty());
        assert_eq!(tool.state(), ToolState::Failed);
        assert_eq!(tool.progress(), 0);
        assert!(seen.iter().all(|&p| p == 0));
    }

    #[test]
    fn test_reorder_and_reverse() {
        let mut tool = ToolController::new(ToolKind::Merge);
        tool.add_files(vec![
            pdf_file("a.pdf", 1),
            pdf_file("b.pdf", 1),
            pdf_file("c.pdf", 1),
        ]);
        assert!(tool.move_up(2));
        assert!(!tool.move_up(0));
        assert!(!tool.move_down(2));
        let names: Vec<&str> = tool.files().iter().map(|f| f.source.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "c.pdf", "b.pdf"]);

        tool.set_reverse_order(true);
        let mut sink = MemorySink::new();
        assert!(tool.execute(&mut sink, &mut NoProgress).is_success());
        let merged = &sink.last().unwrap().bytes;
        let order: Vec<String> = (1..=3).map(|n| page_text(merged, n)).collect();
        assert_eq!(order, vec!["b-Page-1", "c-Page-1", "a-Page-1"]);
    }

    #[test]
    fn test_single_file_tools_replace_the_file() {
        let mut tool = ToolController::new(ToolKind::Compress);
        tool.add_files(vec![pdf_file("old.pdf", 1)]);
        tool.add_files(vec![pdf_file("new.pdf", 2)]);
        assert_eq!(tool.files().len(), 1);
        assert_eq!(tool.files()[0].source.name, "new.pdf");
        assert_eq!(tool.files()[0].page_count, Some(2));
    }

    #[test]
    fn test_wrong_file_type_is_rejected() {
        let mut tool = ToolController::new(ToolKind::Split);
        let note = tool.add_files(vec![IncomingFile::new("a.png", "image/png", vec![1])]);
        assert_eq!(
            note,
            Notification::destructive("Invalid file type", "Please upload PDF files only")
        );
        assert_eq!(tool.state(), ToolState::Idle);
    }

    #[test]
    fn test_convert_report_to_text() {
        let mut tool = ToolController::new(ToolKind::Convert);
        tool.add_files(vec![pdf_file("report.pdf", 3)]);
        tool.set_format(ConversionFormat::Text);

        let mut sink = MemorySink::new();
        let note = tool.execute(&mut sink, &mut NoProgress);
        assert_eq!(note.description, "Successfully converted PDF to TEXT");

        let output = sink.last().unwrap();
        assert_eq!(output.file_name, "report.txt");
        let text = String::from_utf8(output.bytes.clone()).unwrap();
        let headers: Vec<&str> = text.lines().filter(|l| l.starts_with("Page ")).collect();
        assert_eq!(headers, vec!["Page 1", "Page 2", "Page 3"]);
    }

    #[test]
    fn test_convert_word_to_pdf() {
        let mut tool = ToolController::new(ToolKind::Convert);
        tool.add_files(vec![IncomingFile::new(
            "letter.docx",
            "",
            create_test_docx(&["Dear reader"]),
        )]);
        tool.set_format(ConversionFormat::WordToPdf);

        let mut sink = MemorySink::new();
        let note = tool.execute(&mut sink, &mut NoProgress);
        assert_eq!(note.description, "Successfully converted Word to PDF");
        assert_eq!(sink.last().unwrap().file_name, "letter.pdf");
    }

    #[test]
    fn test_convert_protect_needs_password() {
        let mut tool = ToolController::new(ToolKind::Convert);
        tool.add_files(vec![pdf_file("secret.pdf", 1)]);
        tool.set_format(ConversionFormat::Protect);
        assert!(!tool.can_execute());

        let mut sink = MemorySink::new();
        let note = tool.execute(&mut sink, &mut NoProgress);
        assert_eq!(note.title, "Check your input");
        assert!(sink.delivered.is_empty());

        tool.set_password("s3cret");
        assert!(tool.can_execute());
        assert!(tool.execute(&mut sink, &mut NoProgress).is_success());
        assert_eq!(sink.last().unwrap().file_name, "secret_protected.pdf");
    }

    #[test]
    fn test_split_missing_ranges() {
        let mut tool = ToolController::new(ToolKind::Split);
        tool.add_files(vec![pdf_file("doc.pdf", 4)]);
        assert!(!tool.can_execute());

        let note = tool.execute(&mut MemorySink::new(), &mut NoProgress);
        assert_eq!(note.title, "Missing page ranges");

        tool.set_page_selection("2-3");
        let mut sink = MemorySink::new();
        assert!(tool.execute(&mut sink, &mut NoProgress).is_success());
        assert_eq!(crate::get_page_count(&sink.last().unwrap().bytes).unwrap(), 2);
    }

    #[test]
    fn test_edit_applies_log() {
        let mut tool = ToolController::new(ToolKind::Edit);
        tool.add_files(vec![pdf_file("form.pdf", 1)]);
        tool.edit_log_mut().add(EditOperation::AddWhiteRect {
            id: 0,
            page: 1,
            rect: PdfRect::new(0.0, 0.0, 10.0, 10.0),
        });

        let mut sink = MemorySink::new();
        let note = tool.execute(&mut sink, &mut NoProgress);
        assert_eq!(note.title, "Changes Saved");
        assert_eq!(sink.last().unwrap().file_name, "form_edited.pdf");
    }

    #[test]
    fn test_delivery_failure_is_reported() {
        let mut tool = ToolController::new(ToolKind::Compress);
        tool.add_files(vec![pdf_file("a.pdf", 1)]);

        let mut seen = Vec::new();
        let mut progress = |p: u8| seen.push(p);
        let note = tool.execute(&mut BrokenSink, &mut progress);

        assert_eq!(note.severity, Severity::Destructive);
        assert_eq!(note.description, "Failed to compress PDF. Please try again.");
        assert_eq!(tool.state(), ToolState::Failed);
        assert_eq!(tool.progress(), 0);
        assert_eq!(seen.last(), Some(&0));
    }

    #[test]
    fn test_second_run_while_processing_is_rejected() {
        let mut tool = ToolController::new(ToolKind::Compress);
        tool.add_files(vec![pdf_file("a.pdf", 1)]);
        tool.state = ToolState::Processing;
        assert!(!tool.can_execute());

        let mut sink = MemorySink::new();
        let note = tool.execute(&mut sink, &mut NoProgress);
        assert_eq!(note.severity, Severity::Destructive);
        assert_eq!(note.description, "An operation is already in progress");
        assert!(sink.delivered.is_empty());
        assert_eq!(tool.state(), ToolState::Processing);
    }

    #[test]
    fn test_progress_is_monotonic_on_success() {
        let mut tool = ToolController::new(ToolKind::Convert);
        tool.add_files(vec![pdf_file("long.pdf", 7)]);
        let mut seen = Vec::new();
        let mut progress = |p: u8| seen.push(p);
        tool.execute(&mut MemorySink::new(), &mut progress);

        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&100));
    }

    #[test]
    fn test_remove_last_file_goes_idle() {
        let mut tool = ToolController::new(ToolKind::Compress);
        tool.add_files(vec![pdf_file("a.pdf", 1)]);
        assert!(tool.remove_file(0));
        assert!(!tool.remove_file(0));
        assert_eq!(tool.state(), ToolState::Idle);
    }
}
