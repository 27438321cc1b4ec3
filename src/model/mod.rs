//! Document model types.
//!
//! These are the values passed between pipeline stages: blocks grouped into
//! pages, pages into a parsed document, and the chunks derived from them.

mod block;
mod chunk;
mod document;
mod page;

pub use block::{union_bbox, BBox, BlockType, PageBlock};
pub use chunk::{Chunk, ChunkSummary, TokenChunk};
pub use document::{joined_text, DocumentMetadata, ParsedDocument};
pub use page::Page;
