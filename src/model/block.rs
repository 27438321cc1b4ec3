//! Page block types.

use serde::{Deserialize, Serialize};

/// Bounding box as `[x0, y0, x1, y1]`, top-left origin, y growing downwards.
pub type BBox = [f32; 4];

/// Structural role of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// Regular body text
    #[default]
    Paragraph,
    /// Section heading (see `PageBlock::level`)
    Heading,
    /// Bulleted or numbered list entry
    ListItem,
    /// Table content (grid in `PageBlock::raw_cells`)
    TableBlock,
}

impl BlockType {
    /// Stable string form, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::ListItem => "list_item",
            Self::TableBlock => "table_block",
        }
    }
}

/// One unit of page content: a paragraph, heading, list item or table.
///
/// Blocks are values. Every pipeline stage returns new blocks rather than
/// mutating the ones it was given.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageBlock {
    /// Block type
    #[serde(rename = "type")]
    pub block_type: BlockType,

    /// Text content
    pub text: String,

    /// Heading level (1 = top level); only meaningful for headings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,

    /// Bounding box on the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,

    /// Table grid (rows of cell texts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_cells: Option<Vec<Vec<String>>>,

    /// Font size in points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,

    /// Font name (e.g., "Helvetica-Bold")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,

    /// Paragraph style name (DOCX)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    /// Source page, set when the block is placed in a chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

impl PageBlock {
    /// Create a paragraph block with the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Create a heading block.
    pub fn heading(text: impl Into<String>, level: u8) -> Self {
        Self::new(text).with_type(BlockType::Heading).with_level(level)
    }

    /// Create a table block from a grid of cells.
    ///
    /// The text form is each non-empty row joined by `" | "`, rows joined by newlines.
    pub fn table(raw_cells: Vec<Vec<String>>) -> Self {
        let text = raw_cells
            .iter()
            .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
            .map(|row| row.join(" | "))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            block_type: BlockType::TableBlock,
            text,
            raw_cells: Some(raw_cells),
            ..Default::default()
        }
    }

    /// Set block type.
    pub fn with_type(mut self, block_type: BlockType) -> Self {
        self.block_type = block_type;
        self
    }

    /// Set heading level.
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    /// Clear heading level.
    pub fn without_level(mut self) -> Self {
        self.level = None;
        self
    }

    /// Set bounding box.
    pub fn with_bbox(mut self, bbox: BBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Set font name and size.
    pub fn with_font(mut self, name: impl Into<String>, size: f32) -> Self {
        self.font_name = Some(name.into());
        self.font_size = Some(size);
        self
    }

    /// Set style name.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Set source page number.
    pub fn with_page_number(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }

    /// Check whether this block is a heading.
    pub fn is_heading(&self) -> bool {
        self.block_type == BlockType::Heading
    }

    /// Check whether this block is a table.
    pub fn is_table(&self) -> bool {
        self.block_type == BlockType::TableBlock
    }

    /// Heading level if this block is a heading.
    pub fn heading_level(&self) -> Option<u8> {
        if self.is_heading() {
            self.level
        } else {
            None
        }
    }

    /// Top edge (y0) of the bounding box.
    pub fn top(&self) -> Option<f32> {
        self.bbox.map(|b| b[1])
    }

    /// Bottom edge (y1) of the bounding box.
    pub fn bottom(&self) -> Option<f32> {
        self.bbox.map(|b| b[3])
    }
}

/// Smallest box containing both inputs.
pub fn union_bbox(a: Option<BBox>, b: Option<BBox>) -> Option<BBox> {
    match (a, b) {
        (Some(a), Some(b)) => Some([
            a[0].min(b[0]),
            a[1].min(b[1]),
            a[2].max(b[2]),
            a[3].max(b[3]),
        ]),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}
