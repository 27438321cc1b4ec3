//! # tenderdoc
//!
//! Structural parsing and chunking of procurement tender documents.
//!
//! PDF and DOCX files are turned into pages of typed blocks (paragraphs,
//! headings, list items, tables), grouped into heading-anchored sections and
//! sliced into overlapping token windows ready for embedding.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tenderdoc::{render, JsonFormat, Tenderdoc};
//!
//! fn main() -> tenderdoc::Result<()> {
//!     let result = Tenderdoc::new().parse("capitolato.pdf")?;
//!
//!     for window in result.token_chunks() {
//!         println!("{} [{}]", window.id, window.section_path);
//!     }
//!
//!     println!("{}", render::to_json(result.document(), JsonFormat::Pretty)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Layout**: glyph spans → lines → paragraphs, label/value merge, reading order
//! - **Tagging**: font-statistics and lexical heading detection, table detection
//! - **Filtering**: running header/footer and boilerplate removal
//! - **OCR gate**: scanned PDFs are passed through `ocrmypdf`
//! - **Chunking**: level-1 sections, then token windows with tender metadata

pub mod chunking;
pub mod detect;
pub mod error;
pub mod ingest;
pub mod model;
pub mod ocr;
pub mod parser;
pub mod render;
pub mod text;

// Re-export commonly used types
pub use chunking::{DynamicChunker, TokenChunker, TokenChunkerConfig, Tokenizer, WhitespaceTokenizer};
pub use detect::{detect_format_from_bytes, detect_format_from_path, DocumentFormat};
pub use error::{Error, Result};
pub use ingest::{
    DocumentParser, Extraction, IngestionOptions, IngestionService, OcrFailurePolicy,
    ParserRegistry,
};
pub use model::{
    BlockType, Chunk, DocumentMetadata, Page, PageBlock, ParsedDocument, TokenChunk,
};
pub use ocr::{OcrEngine, OcrMyPdf};
pub use parser::{DocxParser, ParseOptions, PdfParser};
pub use render::JsonFormat;
pub use text::{LanguageDetector, TextNormalizer, WhatlangDetector};

use std::path::Path;

/// Parse a PDF or DOCX file with default options.
///
/// # Example
///
/// ```no_run
/// use tenderdoc::parse_file;
///
/// let doc = parse_file("bando.pdf").unwrap();
/// println!("Pages: {}", doc.total_pages);
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ParsedDocument> {
    parse_file_with_options(path, IngestionOptions::default())
}

/// Parse a PDF or DOCX file with custom options.
///
/// # Example
///
/// ```no_run
/// use tenderdoc::{parse_file_with_options, IngestionOptions, ParseOptions};
///
/// let options = IngestionOptions::new()
///     .with_ocr(false)
///     .with_parse_options(ParseOptions::new().with_tables(false));
/// let doc = parse_file_with_options("disciplinare.docx", options).unwrap();
/// ```
pub fn parse_file_with_options<P: AsRef<Path>>(
    path: P,
    options: IngestionOptions,
) -> Result<ParsedDocument> {
    IngestionService::new(options)?.parse_document(path, None)
}

/// Parse in-memory document bytes; `ext` selects the parser (e.g., "pdf").
///
/// No OCR or language detection is performed.
pub fn parse_bytes(data: &[u8], ext: &str) -> Result<Extraction> {
    ParserRegistry::with_defaults().parse_bytes(data, ext)
}

/// Parse a file and return its token windows with default chunking.
///
/// # Example
///
/// ```no_run
/// let windows = tenderdoc::chunk_file("capitolato.pdf").unwrap();
/// println!("{} windows", windows.len());
/// ```
pub fn chunk_file<P: AsRef<Path>>(path: P) -> Result<Vec<TokenChunk>> {
    Ok(Tenderdoc::new().parse(path)?.token_chunks())
}

/// Builder for parsing and chunking tender documents.
///
/// # Example
///
/// ```no_run
/// use tenderdoc::{Tenderdoc, TokenChunkerConfig};
///
/// let windows = Tenderdoc::new()
///     .without_ocr()
///     .with_preamble()
///     .with_token_config(TokenChunkerConfig::new(400, 200, 60))
///     .parse("avviso.pdf")?
///     .token_chunks();
/// # Ok::<(), tenderdoc::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Tenderdoc {
    ingestion: IngestionOptions,
    chunker: DynamicChunker,
    tokens: TokenChunkerConfig,
}

impl Tenderdoc {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set ingestion options.
    pub fn with_ingestion_options(mut self, options: IngestionOptions) -> Self {
        self.ingestion = options;
        self
    }

    /// Set parser options.
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.ingestion = self.ingestion.with_parse_options(options);
        self
    }

    /// Never run OCR.
    pub fn without_ocr(mut self) -> Self {
        self.ingestion = self.ingestion.with_ocr(false);
        self
    }

    /// OCR every PDF.
    pub fn force_ocr(mut self) -> Self {
        self.ingestion = self.ingestion.with_ocr(true).with_force_ocr(true);
        self
    }

    /// Set the section chunker.
    pub fn with_chunker(mut self, chunker: DynamicChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Keep content before the first level-1 heading.
    pub fn with_preamble(mut self) -> Self {
        self.chunker = self.chunker.with_preamble(true);
        self
    }

    /// Set token window sizes.
    pub fn with_token_config(mut self, config: TokenChunkerConfig) -> Self {
        self.tokens = config;
        self
    }

    /// Parse a file.
    pub fn parse<P: AsRef<Path>>(self, path: P) -> Result<TenderdocResult> {
        let token_chunker = TokenChunker::new(self.tokens)?;
        let document = IngestionService::new(self.ingestion)?.parse_document(path, None)?;
        Ok(TenderdocResult {
            document,
            chunker: self.chunker,
            token_chunker,
        })
    }
}

/// Result of parsing a tender document.
#[derive(Debug, Clone)]
pub struct TenderdocResult {
    /// The parsed document
    pub document: ParsedDocument,
    chunker: DynamicChunker,
    token_chunker: TokenChunker,
}

impl TenderdocResult {
    /// Heading-anchored sections.
    pub fn chunks(&self) -> Vec<Chunk> {
        self.chunker.build_chunks(&self.document.pages)
    }

    /// Token windows over all sections.
    pub fn token_chunks(&self) -> Vec<TokenChunk> {
        self.token_chunker.chunk(&self.chunks())
    }

    /// Convert the parsed document to JSON.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        render::to_json(&self.document, format)
    }

    /// Get plain text of the document.
    pub fn plain_text(&self) -> String {
        self.document.plain_text()
    }

    /// Get the document.
    pub fn document(&self) -> &ParsedDocument {
        &self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Builder Pattern Tests ====================

    #[test]
    fn test_builder_default() {
        let builder = Tenderdoc::default();
        assert!(builder.ingestion.enable_ocr);
        assert!(!builder.chunker.allow_preamble);
        assert_eq!(builder.tokens, TokenChunkerConfig::default());
    }

    #[test]
    fn test_builder_chained() {
        let builder = Tenderdoc::new()
            .without_ocr()
            .with_preamble()
            .with_parse_options(ParseOptions::raw())
            .with_token_config(TokenChunkerConfig::new(100, 50, 10));

        assert!(!builder.ingestion.enable_ocr);
        assert!(!builder.ingestion.parse.detect_headings);
        assert!(builder.chunker.allow_preamble);
        assert_eq!(builder.tokens.max_tokens, 100);
    }

    #[test]
    fn test_builder_force_ocr() {
        let builder = Tenderdoc::new().without_ocr().force_ocr();
        assert!(builder.ingestion.enable_ocr);
        assert!(builder.ingestion.force_ocr);
    }

    // ==================== Edge Case Tests ====================

    #[test]
    fn test_invalid_token_config_fails_before_parsing() {
        let result = Tenderdoc::new()
            .with_token_config(TokenChunkerConfig::new(10, 20, 0))
            .parse("/nonexistent/bando.pdf");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_parse_file_missing() {
        assert!(matches!(parse_file("/nonexistent/bando.pdf"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_parse_file_unsupported() {
        assert!(matches!(
            parse_file("/nonexistent/offerta.xlsx"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_parse_bytes_invalid() {
        assert!(parse_bytes(b"not a pdf", "pdf").is_err());
        assert!(parse_bytes(b"not a zip", "docx").is_err());
        assert!(matches!(parse_bytes(b"", "txt"), Err(Error::UnsupportedFormat(_))));
    }
}
