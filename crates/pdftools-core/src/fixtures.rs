//! Document builders for tests
//!
//! Compiled for this crate's tests and, through the `fixtures` feature, for
//! the test suites of the apps.

use lopdf::{content::Content, content::Operation, dictionary, Dictionary, Document, Object, Stream};
use std::io::{Cursor, Write};

/// Create a PDF with `num_pages` US Letter pages, each showing
/// `"{prefix}-Page-{n}"`
pub fn create_test_pdf(num_pages: u32, prefix: &str) -> Vec<u8> {
    let sizes = vec![(612, 792); num_pages as usize];
    create_pdf_with_sizes(&sizes, prefix)
}

/// Create a PDF with one page per `(width, height)` entry
pub fn create_pdf_with_sizes(sizes: &[(i64, i64)], prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::new();
    for (i, (width, height)) in sizes.iter().enumerate() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(50), Object::Integer(height - 72)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("{}-Page-{}", prefix, i + 1).into_bytes(),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().expect("test content encodes"),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (*width).into(), (*height).into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => sizes.len() as i64,
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("test PDF saves");
    buffer
}

/// Text shown on the given page's content stream, decoded from the raw
/// `Tj` operands
pub fn page_text(pdf: &[u8], page_num: u32) -> String {
    let doc = Document::load_mem(pdf).expect("test PDF loads");
    let page_id = doc.get_pages()[&page_num];
    let content = doc.get_page_content(page_id).expect("page content");
    let content = Content::decode(&content).expect("content decodes");
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| op.operands.first())
        .filter_map(|obj| obj.as_str().ok())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .collect::<Vec<_>>()
        .join("")
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

/// Create a DOCX whose body is the given raw `<w:body>` inner XML
pub fn create_docx_with_body(body_xml: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body_xml
    );

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options).expect("zip entry");
    zip.write_all(CONTENT_TYPES.as_bytes()).expect("zip write");
    zip.start_file("word/document.xml", options).expect("zip entry");
    zip.write_all(document.as_bytes()).expect("zip write");

    zip.finish().expect("zip finish").into_inner()
}

/// Create a DOCX with one plain paragraph per entry
pub fn create_test_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
        .collect();
    create_docx_with_body(&body)
}
