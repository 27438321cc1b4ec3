//! Document ingestion: parser dispatch and the ingestion service.
//!
//! Parsers implement [`DocumentParser`] and are registered in a
//! [`ParserRegistry`] under the file extensions they handle. The
//! [`IngestionService`] looks the parser up by extension, runs the OCR gate
//! for PDFs, detects the language and assembles a [`ParsedDocument`].
//!
//! # Example
//!
//! ```no_run
//! use tenderdoc::ingest::{IngestionService, IngestionOptions};
//!
//! fn main() -> tenderdoc::Result<()> {
//!     let service = IngestionService::new(IngestionOptions::default())?;
//!     let doc = service.parse_document("disciplinare.pdf", None)?;
//!     println!("{} pages, language {}", doc.total_pages, doc.language);
//!     Ok(())
//! }
//! ```
//!
//! [`ParsedDocument`]: crate::model::ParsedDocument

mod service;

pub use service::{IngestionOptions, IngestionService, OcrFailurePolicy};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::detect::extension_of;
use crate::error::{Error, Result};
use crate::model::{DocumentMetadata, Page};
use crate::parser::{DocxParser, ParseOptions, PdfParser};

/// Output of a format parser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Pages in document order
    pub pages: Vec<Page>,
    /// Document properties, when the format carries them
    pub metadata: DocumentMetadata,
}

impl Extraction {
    /// Create an extraction without metadata.
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            pages,
            metadata: DocumentMetadata::default(),
        }
    }

    /// Set metadata.
    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A format-specific document parser.
///
/// Implement this trait to add support for a new document format.
pub trait DocumentParser: Send + Sync {
    /// Supported file extensions, lowercase without the leading dot (e.g., `["pdf"]`).
    fn supported_extensions(&self) -> &[&str];

    /// Name of this parser.
    fn name(&self) -> &str;

    /// Parse a file at the given path.
    fn parse(&self, path: &Path) -> Result<Extraction>;

    /// Parse from bytes.
    fn parse_bytes(&self, bytes: &[u8]) -> Result<Extraction>;

    /// Check if this parser supports the given extension (dot optional).
    fn supports_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.supported_extensions().iter().any(|e| *e == ext)
    }
}

/// Registry mapping file extensions to parsers.
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn DocumentParser>>,
    by_name: HashMap<String, Arc<dyn DocumentParser>>,
}

impl ParserRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry with the PDF and DOCX parsers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PdfParser::new()));
        registry.register(Arc::new(DocxParser::new()));
        registry
    }

    /// Create a registry with the PDF and DOCX parsers using custom options.
    pub fn with_options(options: &ParseOptions) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(PdfParser::with_options(options.clone())?));
        registry.register(Arc::new(DocxParser::with_options(options.clone())?));
        Ok(registry)
    }

    /// Register a parser for all its supported extensions.
    ///
    /// A later registration for the same extension replaces the earlier one.
    pub fn register(&mut self, parser: Arc<dyn DocumentParser>) {
        for ext in parser.supported_extensions() {
            self.parsers.insert(ext.to_lowercase(), parser.clone());
        }
        self.by_name.insert(parser.name().to_lowercase(), parser);
    }

    /// Get a parser by file extension (dot optional).
    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn DocumentParser>> {
        self.parsers
            .get(&ext.trim_start_matches('.').to_lowercase())
            .cloned()
    }

    /// Get a parser by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn DocumentParser>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Check if an extension is supported.
    pub fn supports(&self, ext: &str) -> bool {
        self.get_by_extension(ext).is_some()
    }

    /// All supported extensions, sorted.
    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.parsers.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }

    /// Parser for a path, chosen by its extension.
    pub fn parser_for(&self, path: &Path) -> Result<Arc<dyn DocumentParser>> {
        let ext = extension_of(path);
        self.get_by_extension(&ext)
            .ok_or_else(|| Error::UnsupportedFormat(if ext.is_empty() { "(none)".into() } else { ext }))
    }

    /// Parse a file using the parser registered for its extension.
    pub fn parse(&self, path: &Path) -> Result<Extraction> {
        let parser = self.parser_for(path)?;
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        parser.parse(path)
    }

    /// Parse bytes with the parser registered for `ext`.
    pub fn parse_bytes(&self, bytes: &[u8], ext: &str) -> Result<Extraction> {
        let parser = self
            .get_by_extension(ext)
            .ok_or_else(|| Error::UnsupportedFormat(ext.to_string()))?;
        parser.parse_bytes(bytes)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("extensions", &self.supported_extensions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageBlock;

    struct TxtParser;

    impl DocumentParser for TxtParser {
        fn supported_extensions(&self) -> &[&str] {
            &["txt"]
        }

        fn name(&self) -> &str {
            "txt"
        }

        fn parse(&self, path: &Path) -> Result<Extraction> {
            let text = std::fs::read_to_string(path)?;
            self.parse_bytes(text.as_bytes())
        }

        fn parse_bytes(&self, bytes: &[u8]) -> Result<Extraction> {
            let text = String::from_utf8_lossy(bytes).to_string();
            Ok(Extraction::new(vec![Page::new(1, vec![PageBlock::new(text)])]))
        }
    }

    #[test]
    fn test_registry_with_defaults() {
        let registry = ParserRegistry::with_defaults();
        assert!(registry.supports("pdf"));
        assert!(registry.supports(".PDF"));
        assert!(registry.supports("docx"));
        assert!(registry.supports("doc"));
        assert!(!registry.supports("txt"));
        assert_eq!(registry.supported_extensions(), vec!["doc", "docx", "pdf"]);
    }

    #[test]
    fn test_registry_get_by_name() {
        let registry = ParserRegistry::with_defaults();
        assert_eq!(registry.get_by_name("PDF").unwrap().name(), "pdf");
        assert_eq!(registry.get_by_extension("doc").unwrap().name(), "docx");
    }

    #[test]
    fn test_unsupported_extension() {
        let registry = ParserRegistry::with_defaults();
        let err = registry.parse(Path::new("capitolato.odt")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ext) if ext == ".odt"));

        let err = registry.parse(Path::new("senza_estensione")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file() {
        let registry = ParserRegistry::with_defaults();
        let err = registry.parse(Path::new("/nonexistent/bando.pdf")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_custom_parser_registration() {
        let mut registry = ParserRegistry::new();
        registry.register(Arc::new(TxtParser));
        let extraction = registry.parse_bytes(b"avviso", "txt").unwrap();
        assert_eq!(extraction.pages[0].blocks[0].text, "avviso");
        assert!(registry.parse_bytes(b"x", "pdf").is_err());
    }

    #[test]
    fn test_supports_extension_default_method() {
        assert!(TxtParser.supports_extension(".TXT"));
        assert!(!TxtParser.supports_extension("pdf"));
    }
}
