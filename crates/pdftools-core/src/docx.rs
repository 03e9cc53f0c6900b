//! Minimal DOCX reading and writing
//!
//! A DOCX file is a zip package of XML parts. Writing produces the three
//! parts Word needs to open a single-section document; reading walks
//! `word/document.xml` and renders paragraphs as simple HTML.

use crate::error::PdfToolsError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Read, Write};
use zip::ZipArchive;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DOCUMENT_PART: &str = "word/document.xml";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// A4 in twentieths of a point
const PAGE_WIDTH_TWIPS: &str = "11906";
const PAGE_HEIGHT_TWIPS: &str = "16838";

/// Serialize a single-section document with one paragraph per entry.
/// Newlines inside a paragraph become line breaks.
pub fn assemble_docx(paragraphs: &[String]) -> Result<Vec<u8>, PdfToolsError> {
    let document_xml = write_document_xml(paragraphs)
        .map_err(|e| PdfToolsError::Serialization(format!("document.xml: {}", e)))?;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let parts: [(&str, &[u8]); 3] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        (DOCUMENT_PART, &document_xml),
    ];
    for (name, data) in parts {
        zip.start_file(name, options)
            .map_err(|e| PdfToolsError::Serialization(format!("{}: {}", name, e)))?;
        zip.write_all(data)
            .map_err(|e| PdfToolsError::Serialization(format!("{}: {}", name, e)))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| PdfToolsError::Serialization(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn write_document_xml(paragraphs: &[String]) -> Result<Vec<u8>, quick_xml::Error> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut root = BytesStart::new("w:document");
    root.push_attribute(("xmlns:w", W_NS));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("w:body")))?;

    for paragraph in paragraphs {
        writer.write_event(Event::Start(BytesStart::new("w:p")))?;
        writer.write_event(Event::Start(BytesStart::new("w:r")))?;

        let lines: Vec<&str> = paragraph.split('\n').collect();
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                writer.write_event(Event::Empty(BytesStart::new("w:br")))?;
            }
            if !line.is_empty() {
                let t = BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]);
                writer.write_event(Event::Start(t))?;
                writer.write_event(Event::Text(BytesText::new(line)))?;
                writer.write_event(Event::End(BytesEnd::new("w:t")))?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new("w:r")))?;
        writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    }

    writer.write_event(Event::Start(BytesStart::new("w:sectPr")))?;
    let page_size = BytesStart::new("w:pgSz")
        .with_attributes([("w:w", PAGE_WIDTH_TWIPS), ("w:h", PAGE_HEIGHT_TWIPS)]);
    writer.write_event(Event::Empty(page_size))?;
    writer.write_event(Event::End(BytesEnd::new("w:sectPr")))?;

    writer.write_event(Event::End(BytesEnd::new("w:body")))?;
    writer.write_event(Event::End(BytesEnd::new("w:document")))?;

    Ok(writer.into_inner().into_inner())
}

/// Render the document body as HTML
///
/// Paragraphs become `<p>` (or `<h1>`..`<h6>` for heading styles), bold and
/// italic runs become `<strong>` / `<em>`, breaks become `<br />`. Empty
/// paragraphs are skipped. No separators are emitted between blocks.
pub fn docx_to_html(bytes: &[u8]) -> Result<String, PdfToolsError> {
    let xml = read_document_part(bytes)?;
    let doc = roxmltree::Document::parse(&xml)
        .map_err(|e| PdfToolsError::Conversion(format!("Invalid document.xml: {}", e)))?;

    let body = doc
        .descendants()
        .find(|n| is_w(n, "body"))
        .ok_or_else(|| PdfToolsError::Conversion("document.xml has no body".into()))?;

    let mut html = String::new();
    for paragraph in body.descendants().filter(|n| is_w(n, "p")) {
        let inner = render_runs(&paragraph);
        if inner.is_empty() {
            continue;
        }
        let tag = heading_level(&paragraph)
            .map(|level| format!("h{}", level))
            .unwrap_or_else(|| "p".to_string());
        html.push_str(&format!("<{}>{}</{}>", tag, inner, tag));
    }

    Ok(html)
}

fn read_document_part(bytes: &[u8]) -> Result<String, PdfToolsError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PdfToolsError::Conversion(format!("Not a Word document: {}", e)))?;

    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|_| PdfToolsError::Conversion(format!("Missing {}", DOCUMENT_PART)))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| PdfToolsError::Conversion(format!("Unreadable {}: {}", DOCUMENT_PART, e)))?;
    Ok(xml)
}

fn is_w(node: &roxmltree::Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(W_NS)
}

fn w_child<'a, 'input>(
    node: &roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children().find(|c| is_w(c, name))
}

/// `Heading1`..`Heading6` paragraph styles map to heading levels
fn heading_level(paragraph: &roxmltree::Node) -> Option<u8> {
    let style = w_child(paragraph, "pPr")
        .and_then(|ppr| w_child(&ppr, "pStyle"))
        .and_then(|s| s.attribute((W_NS, "val")))?;
    let level: u8 = style.strip_prefix("Heading")?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

/// Toggle properties such as `<w:b/>` are on unless `w:val` says otherwise
fn run_flag(rpr: Option<roxmltree::Node>, name: &str) -> bool {
    rpr.and_then(|rpr| w_child(&rpr, name))
        .map(|flag| !matches!(flag.attribute((W_NS, "val")), Some("0" | "false" | "none")))
        .unwrap_or(false)
}

fn render_runs(paragraph: &roxmltree::Node) -> String {
    let mut out = String::new();

    // Runs may sit directly in the paragraph or inside hyperlinks
    for run in paragraph.descendants().filter(|n| is_w(n, "r")) {
        let mut text = String::new();
        for child in run.children().filter(|c| c.is_element()) {
            if is_w(&child, "t") {
                text.push_str(&escape_html(child.text().unwrap_or("")));
            } else if is_w(&child, "tab") {
                text.push('\t');
            } else if is_w(&child, "br") || is_w(&child, "cr") {
                text.push_str("<br />");
            }
        }
        if text.is_empty() {
            continue;
        }

        let rpr = w_child(&run, "rPr");
        if run_flag(rpr, "i") {
            text = format!("<em>{}</em>", text);
        }
        if run_flag(rpr, "b") {
            text = format!("<strong>{}</strong>", text);
        }
        out.push_str(&text);
    }

    out
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
