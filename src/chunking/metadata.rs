//! Regex-derived tender metadata.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Tender code such as `123456-2024`.
static TENDER_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{6}-\d{4}\b").unwrap());

/// Lot identifier such as `lot-3`, `lot_a`, `lot 2`, matched on lowercased text.
static LOT_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\blot[-_ ]?\w+\b").unwrap());

/// Keyword to document type, first match wins.
pub const DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("bando", "tender_notice"),
    ("avviso", "notice"),
    ("rettifica", "corrigendum"),
    ("capitolato", "specs"),
    ("disciplinare", "disciplinare"),
];

pub const TENDER_CODE_KEY: &str = "tender_code";
pub const LOT_ID_KEY: &str = "lot_id";
pub const DOCUMENT_TYPE_KEY: &str = "document_type";
pub const CLAUSE_TYPE_KEY: &str = "clause_type";

/// Scan `title` and `text` for tender metadata.
///
/// Keys are only present when found: `tender_code`, `lot_id`,
/// `document_type` and `clause_type` (`"article"`).
pub fn extract_metadata(title: &str, text: &str) -> BTreeMap<String, String> {
    let merged = format!("{} {}", title, text);
    let lower = merged.to_lowercase();
    let mut metadata = BTreeMap::new();

    if let Some(m) = TENDER_CODE.find(&merged) {
        metadata.insert(TENDER_CODE_KEY.to_string(), m.as_str().to_string());
    }
    if let Some(m) = LOT_ID.find(&lower) {
        metadata.insert(LOT_ID_KEY.to_string(), m.as_str().to_string());
    }
    if let Some((_, doc_type)) = DOCUMENT_TYPES.iter().find(|(kw, _)| lower.contains(kw)) {
        metadata.insert(DOCUMENT_TYPE_KEY.to_string(), doc_type.to_string());
    }
    if lower.contains("art.") || lower.contains("articolo") {
        metadata.insert(CLAUSE_TYPE_KEY.to_string(), "article".to_string());
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_match() {
        let md = extract_metadata(
            "Disciplinare di gara",
            "Procedura 123456-2024, LOT-3. Si rinvia all'Art. 5 del bando.",
        );
        assert_eq!(md[TENDER_CODE_KEY], "123456-2024");
        assert_eq!(md[LOT_ID_KEY], "lot-3");
        // "bando" precedes "disciplinare" in the keyword table
        assert_eq!(md[DOCUMENT_TYPE_KEY], "tender_notice");
        assert_eq!(md[CLAUSE_TYPE_KEY], "article");
    }

    #[test]
    fn test_no_match() {
        assert!(extract_metadata("", "Nessun riferimento utile").is_empty());
    }

    #[test]
    fn test_tender_code_needs_word_boundaries() {
        assert!(extract_metadata("", "1234567-2024").get(TENDER_CODE_KEY).is_none());
        assert!(extract_metadata("", "codice 654321-2023.").contains_key(TENDER_CODE_KEY));
    }

    #[test]
    fn test_lot_id_case_insensitive() {
        assert_eq!(extract_metadata("", "vedi lot_B2")[LOT_ID_KEY], "lot_b2");
        assert_eq!(extract_metadata("Lot 7", "")[LOT_ID_KEY], "lot 7");
    }

    #[test]
    fn test_document_type_and_clause() {
        let md = extract_metadata("CAPITOLATO SPECIALE", "articolo unico");
        assert_eq!(md[DOCUMENT_TYPE_KEY], "specs");
        assert_eq!(md[CLAUSE_TYPE_KEY], "article");

        assert_eq!(extract_metadata("", "avviso di rettifica")[DOCUMENT_TYPE_KEY], "notice");
    }
}
