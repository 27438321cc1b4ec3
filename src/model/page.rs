//! Page-level types.

use super::PageBlock;
use serde::{Deserialize, Serialize};

/// A page of extracted content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub page_number: u32,

    /// Page width in points (PDF only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,

    /// Page height in points (PDF only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,

    /// Blocks in reading order
    pub blocks: Vec<PageBlock>,
}

impl Page {
    /// Create a new page without dimensions.
    pub fn new(page_number: u32, blocks: Vec<PageBlock>) -> Self {
        Self {
            page_number,
            width: None,
            height: None,
            blocks,
        }
    }

    /// Set page dimensions.
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Replace the blocks, keeping number and dimensions.
    pub fn with_blocks(&self, blocks: Vec<PageBlock>) -> Self {
        Self {
            page_number: self.page_number,
            width: self.width,
            height: self.height,
            blocks,
        }
    }

    /// Check if the page has no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of characters across all blocks.
    pub fn char_count(&self) -> usize {
        self.blocks.iter().map(|b| b.text.chars().count()).sum()
    }

    /// Plain text of the page, one block per line.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
