//! PDF to plain text
//!
//! The output describes each page by its number and geometry. Extracted
//! page text is appended only when requested.

use crate::error::PdfToolsError;
use crate::load_unprotected;
use crate::page_info::PageInfo;
use crate::progress::{Progress, ProgressSink};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextOptions {
    /// Append the text extracted from each page's content streams
    #[serde(default)]
    pub include_content: bool,
}

/// Render one page header block
pub fn page_header(page_num: u32, width: f32, height: f32) -> String {
    format!("Page {}\nSize: {}x{}\n", page_num, width, height)
}

/// Convert a PDF into a plain-text page listing
pub fn convert_to_text(
    bytes: &[u8],
    options: &TextOptions,
    progress: &mut dyn ProgressSink,
) -> Result<String, PdfToolsError> {
    let doc = load_unprotected(bytes)?;
    let pages = doc.get_pages();
    let total = pages.len();

    let mut progress = Progress::start(progress);
    let mut text = String::new();

    for (index, (page_num, page_id)) in pages.into_iter().enumerate() {
        let info = PageInfo::from_page(&doc, page_num, page_id)?;
        text.push_str(&page_header(page_num, info.width, info.height));

        if options.include_content {
            match doc.extract_text(&[page_num]) {
                Ok(content) => {
                    let content = content.trim();
                    if !content.is_empty() {
                        text.push_str(content);
                        text.push('\n');
                    }
                }
                Err(e) => warn!(page_num, error = %e, "text extraction failed"),
            }
        }

        text.push('\n');
        debug!(page_num, "page described");
        progress.step(index + 1, total);
    }

    progress.finish();
    info!(pages = total, chars = text.len(), "converted PDF to text");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{create_pdf_with_sizes, create_test_pdf};
    use crate::protect::{protect_document, Credential};
    use crate::progress::NoProgress;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_one_header_per_page_in_order() {
        let pdf = create_test_pdf(3, "Report");
        let text = convert_to_text(&pdf, &TextOptions::default(), &mut NoProgress).unwrap();

        let headers: Vec<&str> = text.lines().filter(|l| l.starts_with("Page ")).collect();
        assert_eq!(headers, vec!["Page 1", "Page 2", "Page 3"]);
    }

    #[test]
    fn test_exact_output_format() {
        let pdf = create_pdf_with_sizes(&[(612, 792), (842, 595)], "Fmt");
        let text = convert_to_text(&pdf, &TextOptions::default(), &mut NoProgress).unwrap();
        assert_eq!(
            text,
            "Page 1\nSize: 612x792\n\nPage 2\nSize: 842x595\n\n"
        );
    }

    #[test]
    fn test_fractional_sizes_print_shortest_form() {
        assert_eq!(page_header(1, 595.28, 841.89), "Page 1\nSize: 595.28x841.89\n");
    }

    #[test]
    fn test_progress_reaches_100() {
        let pdf = create_test_pdf(4, "Progress");
        let mut seen = Vec::new();
        let mut sink = |p: u8| seen.push(p);
        convert_to_text(&pdf, &TextOptions::default(), &mut sink).unwrap();
        assert_eq!(seen, vec![0, 25, 50, 75, 100]);
    }

    #[test]
    fn test_invalid_bytes_fail_with_load_error() {
        let result = convert_to_text(b"not a pdf", &TextOptions::default(), &mut NoProgress);
        assert!(matches!(result, Err(PdfToolsError::DocumentLoad(_))));
    }

    #[test]
    fn test_include_content_keeps_headers() {
        let pdf = create_test_pdf(2, "Body");
        let options = TextOptions {
            include_content: true,
        };
        let text = convert_to_text(&pdf, &options, &mut NoProgress).unwrap();
        assert!(text.starts_with("Page 1\nSize: 612x792\n"));
        assert_eq!(text.matches("Size: 612x792").count(), 2);
    }

    #[test]
    fn test_protected_pdf_is_refused() {
        let pdf = create_test_pdf(2, "Locked");
        let locked = protect_document(&pdf, &Credential::new("pw")).unwrap();
        let options = TextOptions {
            include_content: true,
        };
        assert!(matches!(
            convert_to_text(&locked, &options, &mut NoProgress),
            Err(PdfToolsError::DocumentLoad(_))
        ));
    }
}
