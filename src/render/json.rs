//! JSON rendering for parsed documents and chunks.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::Chunk;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize any pipeline output to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Serialize chunks, optionally without their block lists.
pub fn chunks_to_json(chunks: &[Chunk], include_blocks: bool, format: JsonFormat) -> Result<String> {
    if include_blocks {
        to_json(chunks, format)
    } else {
        let summaries: Vec<_> = chunks.iter().map(Chunk::summary).collect();
        to_json(&summaries, format)
    }
}

/// One compact JSON document per line.
pub fn to_json_lines<T: Serialize>(items: &[T]) -> Result<String> {
    let mut out = String::new();
    for item in items {
        out.push_str(&to_json(item, JsonFormat::Compact)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentMetadata, Page, PageBlock, ParsedDocument, TokenChunk};
    use std::collections::BTreeMap;

    fn document() -> ParsedDocument {
        ParsedDocument {
            doc_id: "d1".into(),
            filename: "bando.pdf".into(),
            extension: ".pdf".into(),
            language: "it".into(),
            pages: vec![Page::new(1, vec![PageBlock::heading("Art. 1", 2)])],
            total_pages: 1,
            metadata: DocumentMetadata {
                title: Some("Bando".into()),
                ..Default::default()
            },
        }
    }

    fn chunk() -> Chunk {
        Chunk {
            id: "c1".into(),
            title: "CAPO I".into(),
            heading_level: 1,
            text: "testo".into(),
            blocks: vec![PageBlock::heading("CAPO I", 1).with_page_number(1)],
            page_numbers: vec![1],
        }
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&document(), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"title\""));
        assert!(json.contains("\"type\": \"heading\""));
        assert!(json.contains('\n')); // Pretty has newlines
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&document(), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n')); // Compact has no newlines
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["pages"][0]["blocks"][0]["level"], 2);
    }

    #[test]
    fn test_chunks_with_and_without_blocks() {
        let chunks = vec![chunk()];
        let full: serde_json::Value =
            serde_json::from_str(&chunks_to_json(&chunks, true, JsonFormat::Compact).unwrap()).unwrap();
        let compact: serde_json::Value =
            serde_json::from_str(&chunks_to_json(&chunks, false, JsonFormat::Compact).unwrap()).unwrap();
        assert_eq!(full[0]["blocks"][0]["page_number"], 1);
        assert!(compact[0].get("blocks").is_none());
        assert_eq!(compact[0]["page_numbers"][0], 1);
    }

    #[test]
    fn test_json_lines() {
        let windows = vec![
            TokenChunk {
                id: "c1:0-2".into(),
                text: "a b".into(),
                section_path: "CAPO I".into(),
                metadata: BTreeMap::new(),
                page_numbers: vec![1],
                source_chunk_id: "c1".into(),
            };
            2
        ];
        let lines = to_json_lines(&windows).unwrap();
        assert_eq!(lines.lines().count(), 2);
        assert!(lines.lines().all(|l| l.starts_with("{\"id\":\"c1:0-2\"")));
    }
}
