//! Page-level information extraction
//!
//! Reads page geometry, walking up the page tree for inherited attributes.

use crate::error::PdfToolsError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;
use tracing::warn;

/// US Letter, used when no MediaBox is found anywhere in the tree
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Guard against cyclic Parent chains in malformed files
const MAX_TREE_DEPTH: usize = 32;

/// Information about a single PDF page
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageInfo {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: i32,
    pub orientation: PageOrientation,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

impl PageInfo {
    pub fn from_page(doc: &Document, page_num: u32, page_id: ObjectId) -> Result<Self, PdfToolsError> {
        let page_dict = doc
            .get_dictionary(page_id)
            .map_err(|_| PdfToolsError::DocumentLoad(format!("Page {} is not a dictionary", page_num)))?;

        let media_box = match inherited_attribute(doc, page_dict, b"MediaBox") {
            Some(obj) => parse_box(doc, obj)?,
            None => {
                warn!(page_num, "page has no MediaBox, assuming US Letter");
                DEFAULT_MEDIA_BOX
            }
        };
        let width = (media_box[2] - media_box[0]).abs();
        let height = (media_box[3] - media_box[1]).abs();

        let rotation = inherited_attribute(doc, page_dict, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .map(|angle| normalize_rotation(angle as i32))
            .unwrap_or(0);

        let (effective_width, effective_height) = if rotation == 90 || rotation == 270 {
            (height, width)
        } else {
            (width, height)
        };

        let orientation = if (effective_width - effective_height).abs() < 1.0 {
            PageOrientation::Square
        } else if effective_width > effective_height {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        };

        Ok(Self {
            page_num,
            width: width as f32,
            height: height as f32,
            rotation,
            orientation,
        })
    }
}

/// Page infos for every page, in document order
pub fn page_infos(doc: &Document) -> Result<Vec<PageInfo>, PdfToolsError> {
    doc.get_pages()
        .into_iter()
        .map(|(page_num, page_id)| PageInfo::from_page(doc, page_num, page_id))
        .collect()
}

/// Look up a page attribute, following Parent links for inheritable keys
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_dict;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

fn parse_box(doc: &Document, obj: &Object) -> Result<[f64; 4], PdfToolsError> {
    let obj = match obj {
        Object::Reference(id) => doc
            .get_object(*id)
            .map_err(|e| PdfToolsError::DocumentLoad(e.to_string()))?,
        other => other,
    };
    let array = obj
        .as_array()
        .map_err(|_| PdfToolsError::DocumentLoad("MediaBox is not an array".into()))?;
    parse_box_array(array)
}

/// Parse a box array [x1, y1, x2, y2]
fn parse_box_array(array: &[Object]) -> Result<[f64; 4], PdfToolsError> {
    if array.len() != 4 {
        return Err(PdfToolsError::DocumentLoad(
            "MediaBox must have 4 elements".into(),
        ));
    }

    let mut result = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        result[i] = match obj {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => {
                return Err(PdfToolsError::DocumentLoad(format!(
                    "MediaBox element {} is not a number",
                    i
                )))
            }
        };
    }

    Ok(result)
}

/// Normalize rotation to 0, 90, 180, or 270
fn normalize_rotation(angle: i32) -> i32 {
    angle.rem_euclid(360)
}
