//! Document-level types.

use super::Page;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A parsed tender document, as produced by the ingestion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Document identifier (caller supplied or random UUID)
    pub doc_id: String,

    /// Original file name
    pub filename: String,

    /// Lowercase extension including the dot (e.g., ".pdf")
    pub extension: String,

    /// Detected language code, or "unknown"
    pub language: String,

    /// Pages in document order
    pub pages: Vec<Page>,

    /// Number of pages
    pub total_pages: usize,

    /// Document properties
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl ParsedDocument {
    /// Total number of blocks across all pages.
    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|p| p.blocks.len()).sum()
    }

    /// All block texts joined by single spaces.
    pub fn joined_text(&self) -> String {
        joined_text(&self.pages)
    }

    /// Plain text of the whole document, pages separated by blank lines.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.plain_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// All block texts of `pages` joined by single spaces.
pub fn joined_text(pages: &[Page]) -> String {
    pages
        .iter()
        .flat_map(|p| p.blocks.iter())
        .map(|b| b.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Document properties read from the PDF Info dictionary or DOCX core properties.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Document title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Document author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Document subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Creating application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,

    /// Producing application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,

    /// Creation date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl DocumentMetadata {
    /// Check whether no property is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
