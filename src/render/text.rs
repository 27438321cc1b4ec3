//! Plain text rendering for parsed documents and chunks.

use crate::model::{Chunk, ParsedDocument};

/// Document text, pages separated by blank lines.
pub fn to_text(doc: &ParsedDocument) -> String {
    doc.plain_text().trim().to_string()
}

/// Sections as `title` lines followed by their body, separated by blank lines.
pub fn chunks_to_text(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| {
            if c.text.is_empty() {
                c.title.clone()
            } else {
                format!("{}\n{}", c.title, c.text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
