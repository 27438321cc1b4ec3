//! Chunking of parsed pages.
//!
//! [`DynamicChunker`] groups blocks into heading-anchored sections;
//! [`TokenChunker`] slices each section into overlapping token windows and
//! tags them with tender metadata.

mod dynamic;
pub mod metadata;
mod token;

pub use dynamic::{DynamicChunker, PREAMBLE_TITLE};
pub use metadata::extract_metadata;
pub use token::{
    build_spans, section_path, TokenChunker, TokenChunkerConfig, Tokenizer, WhitespaceTokenizer,
};
