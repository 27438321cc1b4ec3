//! Chunk types produced by the chunkers.

use std::collections::BTreeMap;

use super::PageBlock;
use serde::{Deserialize, Serialize};

/// A heading-anchored section of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Section title (the anchoring heading text, or "Preamble")
    pub title: String,

    /// Level of the anchoring heading (0 for the preamble)
    pub heading_level: u8,

    /// Section body: block texts joined by newlines, without the anchor heading
    pub text: String,

    /// Blocks of the section, anchor heading included, each tagged with its page
    pub blocks: Vec<PageBlock>,

    /// Sorted, deduplicated page numbers of `blocks`
    pub page_numbers: Vec<u32>,
}

impl Chunk {
    /// Borrowed view serialized without the block list.
    pub fn summary(&self) -> ChunkSummary<'_> {
        ChunkSummary {
            id: &self.id,
            title: &self.title,
            heading_level: self.heading_level,
            text: &self.text,
            page_numbers: &self.page_numbers,
        }
    }

    /// Heading blocks of the section, in order.
    pub fn headings(&self) -> impl Iterator<Item = &PageBlock> {
        self.blocks.iter().filter(|b| b.is_heading())
    }
}

/// Compact serialization of a [`Chunk`] (no blocks).
#[derive(Debug, Clone, Serialize)]
pub struct ChunkSummary<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub heading_level: u8,
    pub text: &'a str,
    pub page_numbers: &'a [u32],
}

/// A token-bounded window over one [`Chunk`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenChunk {
    /// `"<chunk id>:<start>-<end>"` (token offsets)
    pub id: String,

    /// Window text, tokens joined by single spaces
    pub text: String,

    /// Section title followed by nested heading texts, joined by " > "
    pub section_path: String,

    /// Extracted tender metadata (tender_code, lot_id, document_type, clause_type)
    pub metadata: BTreeMap<String, String>,

    /// Page numbers of the source chunk
    pub page_numbers: Vec<u32>,

    /// Identifier of the source chunk
    pub source_chunk_id: String,
}
