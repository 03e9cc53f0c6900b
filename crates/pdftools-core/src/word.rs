//! PDF <-> Word conversion

use crate::docx::{assemble_docx, docx_to_html};
use crate::error::PdfToolsError;
use crate::progress::{Progress, ProgressSink};
use lazy_static::lazy_static;
use lopdf::{
    content::{Content, Operation},
    dictionary, Dictionary, Document, Object, Stream, StringFormat,
};
use regex::Regex;
use tracing::{debug, info};

/// A4 in points
pub const A4_WIDTH: f32 = 595.28;
pub const A4_HEIGHT: f32 = 841.89;

const TEXT_MARGIN: f32 = 50.0;
const TEXT_SIZE: i64 = 12;

lazy_static! {
    static ref TAG_PATTERN: Regex = Regex::new(r"<[^>]*>").expect("static pattern compiles");
}

/// Convert a PDF into a Word document with a single paragraph that labels
/// each page in order
pub fn convert_to_word(
    bytes: &[u8],
    progress: &mut dyn ProgressSink,
) -> Result<Vec<u8>, PdfToolsError> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfToolsError::DocumentLoad(e.to_string()))?;
    let pages = doc.get_pages();
    let total = pages.len();

    let mut progress = Progress::start(progress);
    let mut text = String::new();

    for (index, page_num) in pages.keys().enumerate() {
        text.push_str(&format!("Page {}\nContent from page {}\n", page_num, page_num));
        debug!(page_num, "page labelled");
        progress.step(index + 1, total);
    }

    let output = assemble_docx(&[text])?;
    progress.finish();
    info!(pages = total, size = output.len(), "converted PDF to Word");
    Ok(output)
}

/// Convert a Word document into a one-page PDF
///
/// The document text (tags stripped from its HTML rendering) is drawn as a
/// single run near the top-left corner. Text running past the page edge is
/// clipped by the viewer.
pub fn word_to_pdf(bytes: &[u8]) -> Result<Vec<u8>, PdfToolsError> {
    let html = docx_to_html(bytes)?;
    let text = strip_tags(&html);
    debug!(html_len = html.len(), text_len = text.len(), "stripped document markup");

    let output = single_page_with_text(&text)?;
    info!(size = output.len(), "converted Word to PDF");
    Ok(output)
}

/// Remove anything that looks like a tag and decode the basic entities
///
/// This is a pattern match, not an HTML parser: a stray `<` followed later
/// by `>` swallows the text in between.
pub fn strip_tags(html: &str) -> String {
    let stripped = TAG_PATTERN.replace_all(html, "");
    stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Encode text for a WinAnsi (Windows-1252) simple font
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            c if c.is_control() => b' ',
            c if (c as u32) < 0x80 => c as u8,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}

fn single_page_with_text(text: &str) -> Result<Vec<u8>, PdfToolsError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(TEXT_SIZE)],
            ),
            Operation::new(
                "Td",
                vec![
                    Object::Real(TEXT_MARGIN),
                    Object::Real(A4_HEIGHT - TEXT_MARGIN),
                ],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| PdfToolsError::Serialization(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), Object::Real(A4_WIDTH), Object::Real(A4_HEIGHT)],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfToolsError::Serialization(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}
