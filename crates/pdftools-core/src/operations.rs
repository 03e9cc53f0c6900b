//! Operation log for tracking PDF edit operations
//!
//! The editor records text boxes, shapes and white-out regions as
//! operations against 1-based page numbers. Nothing touches the document
//! until the log is applied.

use serde::{Deserialize, Serialize};

pub type OpId = u64;

/// Rectangle in PDF user space (origin bottom-left, points)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PdfRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// `[llx lly urx ury]` as stored in an annotation's `/Rect`
    pub fn corners(&self) -> [f32; 4] {
        [
            self.x as f32,
            self.y as f32,
            (self.x + self.width) as f32,
            (self.y + self.height) as f32,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub color: String,
    /// Font family or PostScript name, mapped onto the standard 14 fonts
    #[serde(default)]
    pub font_name: Option<String>,
    #[serde(default)]
    pub is_italic: bool,
    #[serde(default)]
    pub is_bold: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            color: "#000000".to_string(),
            font_name: None,
            is_italic: false,
            is_bold: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FontFamily {
    Times,
    Helvetica,
    Courier,
    Symbol,
    ZapfDingbats,
}

impl FontFamily {
    fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        match lower.as_str() {
            "serif" => return FontFamily::Times,
            "monospace" => return FontFamily::Courier,
            "sans-serif" | "cursive" | "fantasy" => return FontFamily::Helvetica,
            _ => {}
        }

        let any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
        if any(&["times", "georgia", "garamond"]) {
            FontFamily::Times
        } else if any(&["courier", "mono", "consolas", "monaco"]) {
            FontFamily::Courier
        } else if lower.contains("symbol") {
            FontFamily::Symbol
        } else if any(&["zapf", "dingbat"]) {
            FontFamily::ZapfDingbats
        } else {
            FontFamily::Helvetica
        }
    }

    fn variant(self, bold: bool, italic: bool) -> &'static str {
        match (self, bold, italic) {
            (FontFamily::Times, false, false) => "Times-Roman",
            (FontFamily::Times, true, false) => "Times-Bold",
            (FontFamily::Times, false, true) => "Times-Italic",
            (FontFamily::Times, true, true) => "Times-BoldItalic",
            (FontFamily::Helvetica, false, false) => "Helvetica",
            (FontFamily::Helvetica, true, false) => "Helvetica-Bold",
            (FontFamily::Helvetica, false, true) => "Helvetica-Oblique",
            (FontFamily::Helvetica, true, true) => "Helvetica-BoldOblique",
            (FontFamily::Courier, false, false) => "Courier",
            (FontFamily::Courier, true, false) => "Courier-Bold",
            (FontFamily::Courier, false, true) => "Courier-Oblique",
            (FontFamily::Courier, true, true) => "Courier-BoldOblique",
            (FontFamily::Symbol, ..) => "Symbol",
            (FontFamily::ZapfDingbats, ..) => "ZapfDingbats",
        }
    }
}

impl TextStyle {
    /// Standard 14 font for this style
    ///
    /// Style words in the font name ("Arial-BoldMT") combine with the
    /// bold/italic flags.
    pub fn pdf_font_name(&self) -> &'static str {
        let name = self.font_name.as_deref().unwrap_or("");
        let lower = name.to_lowercase();
        let bold = self.is_bold || lower.contains("bold");
        let italic = self.is_italic || lower.contains("italic") || lower.contains("oblique");
        FontFamily::from_name(name).variant(bold, italic)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum EditOperation {
    AddText {
        id: OpId,
        page: u32,
        rect: PdfRect,
        text: String,
        style: TextStyle,
    },
    AddRectangle {
        id: OpId,
        page: u32,
        rect: PdfRect,
        stroke_color: String,
        #[serde(default)]
        fill_color: Option<String>,
        #[serde(default = "default_border_width")]
        border_width: f64,
    },
    AddCircle {
        id: OpId,
        page: u32,
        rect: PdfRect,
        stroke_color: String,
        #[serde(default)]
        fill_color: Option<String>,
        #[serde(default = "default_border_width")]
        border_width: f64,
    },
    /// Cover content with an opaque white box
    AddWhiteRect { id: OpId, page: u32, rect: PdfRect },
}

fn default_border_width() -> f64 {
    1.0
}

impl EditOperation {
    pub fn id(&self) -> OpId {
        match self {
            EditOperation::AddText { id, .. }
            | EditOperation::AddRectangle { id, .. }
            | EditOperation::AddCircle { id, .. }
            | EditOperation::AddWhiteRect { id, .. } => *id,
        }
    }

    fn id_mut(&mut self) -> &mut OpId {
        match self {
            EditOperation::AddText { id, .. }
            | EditOperation::AddRectangle { id, .. }
            | EditOperation::AddCircle { id, .. }
            | EditOperation::AddWhiteRect { id, .. } => id,
        }
    }

    pub fn page(&self) -> u32 {
        match self {
            EditOperation::AddText { page, .. }
            | EditOperation::AddRectangle { page, .. }
            | EditOperation::AddCircle { page, .. }
            | EditOperation::AddWhiteRect { page, .. } => *page,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OperationLog {
    next_id: OpId,
    operations: Vec<EditOperation>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an operation, overwriting its id with a fresh one
    pub fn add(&mut self, mut op: EditOperation) -> OpId {
        let id = self.next_id;
        self.next_id += 1;
        *op.id_mut() = id;
        self.operations.push(op);
        id
    }

    pub fn remove(&mut self, id: OpId) -> bool {
        if let Some(pos) = self.operations.iter().position(|op| op.id() == id) {
            self.operations.remove(pos);
            true
        } else {
            false
        }
    }

    /// Drop the most recent operation
    pub fn undo(&mut self) -> Option<EditOperation> {
        self.operations.pop()
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    pub fn operations(&self) -> &[EditOperation] {
        &self.operations
    }

    pub fn operations_for_page(&self, page: u32) -> Vec<&EditOperation> {
        self.operations
            .iter()
            .filter(|op| op.page() == page)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
