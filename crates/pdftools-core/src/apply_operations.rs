//! Apply operations to PDF documents
//!
//! Every operation becomes a page annotation; page content streams are never
//! rewritten.

use crate::error::PdfToolsError;
use crate::load_unprotected;
use crate::operations::{EditOperation, OperationLog, PdfRect, TextStyle};
use crate::progress::{Progress, ProgressSink};
use crate::word::encode_win_ansi;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, info};

/// Parse a hex colour ("#FF0000" or "FF0000") into RGB components in 0..=1.
/// Anything unparseable is black.
pub fn parse_hex_color(color: &str) -> (f32, f32, f32) {
    let hex = color.trim_start_matches('#');
    if hex.len() < 6 || !hex.is_ascii() {
        return (0.0, 0.0, 0.0);
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).unwrap_or(0) as f32 / 255.0
    };
    (channel(0..2), channel(2..4), channel(4..6))
}

/// Apply all operations from the log to a PDF document
///
/// An empty log returns the input unchanged.
pub fn apply_operations(
    pdf_bytes: &[u8],
    log: &OperationLog,
    progress: &mut dyn ProgressSink,
) -> Result<Vec<u8>, PdfToolsError> {
    let mut progress = Progress::start(progress);
    if log.is_empty() {
        progress.finish();
        return Ok(pdf_bytes.to_vec());
    }

    let mut doc = load_unprotected(pdf_bytes)?;
    let pages = doc.get_pages();
    let page_count = pages.len() as u32;

    if let Some(op) = log
        .operations()
        .iter()
        .find(|op| !pages.contains_key(&op.page()))
    {
        return Err(PdfToolsError::InvalidRange(format!(
            "Page {} does not exist (document has {} pages)",
            op.page(),
            page_count
        )));
    }

    for (index, (page_num, page_id)) in pages.iter().enumerate() {
        for op in log.operations_for_page(*page_num) {
            apply_single_operation(&mut doc, *page_id, op)?;
            debug!(page = page_num, op = op.id(), "operation applied");
        }
        progress.step(index + 1, pages.len());
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| PdfToolsError::Serialization(format!("Failed to save edited PDF: {}", e)))?;

    progress.finish();
    info!(operations = log.len(), size = output.len(), "applied edits");
    Ok(output)
}

fn apply_single_operation(
    doc: &mut Document,
    page_id: ObjectId,
    op: &EditOperation,
) -> Result<(), PdfToolsError> {
    let annot = match op {
        EditOperation::AddText {
            rect, text, style, ..
        } => text_annotation(rect, text, style),
        EditOperation::AddRectangle {
            rect,
            stroke_color,
            fill_color,
            border_width,
            ..
        } => shape_annotation(
            "Square",
            rect,
            stroke_color,
            fill_color.as_deref(),
            *border_width,
        ),
        EditOperation::AddCircle {
            rect,
            stroke_color,
            fill_color,
            border_width,
            ..
        } => shape_annotation(
            "Circle",
            rect,
            stroke_color,
            fill_color.as_deref(),
            *border_width,
        ),
        EditOperation::AddWhiteRect { rect, .. } => {
            shape_annotation("Square", rect, "#FFFFFF", Some("#FFFFFF"), 0.0)
        }
    };

    let annot_id = doc.add_object(Object::Dictionary(annot));
    add_annotation_to_page(doc, page_id, annot_id)
}

fn rect_object(rect: &PdfRect) -> Object {
    Object::Array(rect.corners().iter().map(|v| Object::Real(*v)).collect())
}

fn color_object(color: &str) -> Object {
    let (r, g, b) = parse_hex_color(color);
    Object::Array(vec![Object::Real(r), Object::Real(g), Object::Real(b)])
}

fn text_annotation(rect: &PdfRect, text: &str, style: &TextStyle) -> Dictionary {
    let (r, g, b) = parse_hex_color(&style.color);
    let da = format!(
        "/{} {} Tf {} {} {} rg",
        style.pdf_font_name(),
        style.font_size,
        r,
        g,
        b
    );

    dictionary! {
        "Type" => "Annot",
        "Subtype" => "FreeText",
        "Rect" => rect_object(rect),
        "Contents" => Object::String(encode_win_ansi(text), StringFormat::Literal),
        "DA" => Object::String(da.into_bytes(), StringFormat::Literal),
        "BS" => dictionary! { "W" => 0 },
    }
}

fn shape_annotation(
    subtype: &str,
    rect: &PdfRect,
    stroke: &str,
    fill: Option<&str>,
    border_width: f64,
) -> Dictionary {
    let mut annot = dictionary! {
        "Type" => "Annot",
        "Subtype" => subtype,
        "Rect" => rect_object(rect),
        "C" => color_object(stroke),
        "BS" => dictionary! { "W" => Object::Real(border_width as f32) },
    };
    if let Some(fill) = fill {
        annot.set("IC", color_object(fill));
    }
    annot
}

fn add_annotation_to_page(
    doc: &mut Document,
    page_id: ObjectId,
    annot_id: ObjectId,
) -> Result<(), PdfToolsError> {
    // Annots may be stored as an indirect array
    let indirect = match doc.get_dictionary(page_id) {
        Ok(page) => page.get(b"Annots").and_then(Object::as_reference).ok(),
        Err(e) => return Err(PdfToolsError::DocumentLoad(e.to_string())),
    };
    if let Some(array_id) = indirect {
        if let Ok(Object::Array(arr)) = doc.get_object_mut(array_id) {
            arr.push(Object::Reference(annot_id));
            return Ok(());
        }
    }

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| PdfToolsError::DocumentLoad(e.to_string()))?;
    if let Ok(Object::Array(arr)) = page.get_mut(b"Annots") {
        arr.push(Object::Reference(annot_id));
    } else {
        page.set("Annots", Object::Array(vec![Object::Reference(annot_id)]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::create_test_pdf;
    use crate::progress::NoProgress;
    use crate::protect::{protect_document, Credential};
    use pretty_assertions::assert_eq;

    fn annotations(pdf: &[u8], page_num: u32) -> Vec<Dictionary> {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = doc.get_pages()[&page_num];
        let page = doc.get_dictionary(page_id).unwrap();
        match page.get(b"Annots") {
            Ok(Object::Array(refs)) => refs
                .iter()
                .map(|r| {
                    doc.get_dictionary(r.as_reference().unwrap())
                        .unwrap()
                        .clone()
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn subtype(annot: &Dictionary) -> String {
        String::from_utf8_lossy(annot.get(b"Subtype").unwrap().as_name().unwrap()).into_owned()
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF0000"), (1.0, 0.0, 0.0));
        assert_eq!(parse_hex_color("00ff00"), (0.0, 1.0, 0.0));
        assert_eq!(parse_hex_color("#abc"), (0.0, 0.0, 0.0));
        assert_eq!(parse_hex_color("#zzzzzz"), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_protected_pdf_is_refused() {
        let pdf = create_test_pdf(1, "Locked");
        let locked = protect_document(&pdf, &Credential::new("pw")).unwrap();

        let mut log = OperationLog::new();
        log.add(EditOperation::AddText {
            id: 0,
            page: 1,
            rect: PdfRect::new(50.0, 50.0, 100.0, 20.0),
            text: "Hello".into(),
            style: TextStyle::default(),
        });
        match apply_operations(&locked, &log, &mut NoProgress) {
            Err(PdfToolsError::DocumentLoad(msg)) => assert_eq!(msg, "PDF is password protected"),
            other => panic!("expected DocumentLoad, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_empty_log_returns_original() {
        let pdf = create_test_pdf(1, "Edit");
        let result = apply_operations(&pdf, &OperationLog::new(), &mut NoProgress).unwrap();
        assert_eq!(result, pdf);
    }

    #[test]
    fn test_text_becomes_free_text_annotation() {
        let pdf = create_test_pdf(2, "Edit");
        let mut log = OperationLog::new();
        log.add(EditOperation::AddText {
            id: 0,
            page: 2,
            rect: PdfRect::new(100.0, 700.0, 200.0, 20.0),
            text: "Hello World".to_string(),
            style: TextStyle {
                color: "#FF0000".into(),
                font_name: Some("serif".into()),
                is_bold: true,
                ..TextStyle::default()
            },
        });

        let result = apply_operations(&pdf, &log, &mut NoProgress).unwrap();
        assert!(annotations(&result, 1).is_empty());

        let annots = annotations(&result, 2);
        assert_eq!(annots.len(), 1);
        assert_eq!(subtype(&annots[0]), "FreeText");
        assert_eq!(
            annots[0].get(b"Contents").unwrap().as_str().unwrap(),
            b"Hello World"
        );
        let da = annots[0].get(b"DA").unwrap().as_str().unwrap();
        assert_eq!(da, b"/Times-Bold 16 Tf 1 0 0 rg");
    }

    #[test]
    fn test_shapes_and_eraser() {
        let pdf = create_test_pdf(1, "Shapes");
        let mut log = OperationLog::new();
        log.add(EditOperation::AddRectangle {
            id: 0,
            page: 1,
            rect: PdfRect::new(10.0, 10.0, 50.0, 30.0),
            stroke_color: "#0000FF".into(),
            fill_color: None,
            border_width: 2.0,
        });
        log.add(EditOperation::AddCircle {
            id: 0,
            page: 1,
            rect: PdfRect::new(100.0, 100.0, 40.0, 40.0),
            stroke_color: "#000000".into(),
            fill_color: Some("#00FF00".into()),
            border_width: 1.0,
        });
        log.add(EditOperation::AddWhiteRect {
            id: 0,
            page: 1,
            rect: PdfRect::new(200.0, 200.0, 80.0, 12.0),
        });

        let result = apply_operations(&pdf, &log, &mut NoProgress).unwrap();
        let annots = annotations(&result, 1);
        let kinds: Vec<String> = annots.iter().map(subtype).collect();
        assert_eq!(kinds, vec!["Square", "Circle", "Square"]);

        assert!(annots[0].get(b"IC").is_err());
        assert!(annots[1].get(b"IC").is_ok());
        let white: Vec<f32> = annots[2]
            .get(b"IC")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c.as_float().unwrap())
            .collect();
        assert_eq!(white, vec![1.0; 3]);
    }

    #[test]
    fn test_operation_on_missing_page_is_range_error() {
        let pdf = create_test_pdf(2, "Edit");
        let mut log = OperationLog::new();
        log.add(EditOperation::AddWhiteRect {
            id: 0,
            page: 3,
            rect: PdfRect::new(0.0, 0.0, 1.0, 1.0),
        });
        assert!(matches!(
            apply_operations(&pdf, &log, &mut NoProgress),
            Err(PdfToolsError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_existing_annotations_are_kept() {
        let pdf = create_test_pdf(1, "Twice");
        let mut log = OperationLog::new();
        log.add(EditOperation::AddWhiteRect {
            id: 0,
            page: 1,
            rect: PdfRect::new(0.0, 0.0, 5.0, 5.0),
        });
        let once = apply_operations(&pdf, &log, &mut NoProgress).unwrap();
        let twice = apply_operations(&once, &log, &mut NoProgress).unwrap();
        assert_eq!(annotations(&twice, 1).len(), 2);
    }
}
