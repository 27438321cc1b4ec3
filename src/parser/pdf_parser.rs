//! PDF document parser using lopdf.
//!
//! Per page: span extraction, stream-mode table detection, block
//! reconstruction, heading classification and table-like text flagging.
//! Across pages: header/footer removal and boilerplate pruning.

use std::path::Path;

use crate::error::{Error, Result};
use crate::ingest::{DocumentParser, Extraction};
use crate::model::Page;
use crate::text::TextNormalizer;

use super::backend::{LopdfBackend, PageId, PdfBackend};
use super::headings::HeadingClassifier;
use super::layout::{extract_page_spans, LayoutAnalyzer};
use super::options::ParseOptions;
use super::repetition::RepetitionFilter;
use super::table_detector::{flag_table_like_blocks, TableDetector};

/// PDF document parser.
#[derive(Debug, Clone)]
pub struct PdfParser {
    options: ParseOptions,
    normalizer: TextNormalizer,
    analyzer: LayoutAnalyzer,
    classifier: HeadingClassifier,
    detector: TableDetector,
    filter: RepetitionFilter,
}

impl PdfParser {
    /// Create a parser with default options.
    pub fn new() -> Self {
        Self::build(ParseOptions::default(), TextNormalizer::default())
    }

    /// Create a parser with custom options.
    ///
    /// Fails with `Error::Configuration` if the fallback encoding is unknown.
    pub fn with_options(options: ParseOptions) -> Result<Self> {
        let normalizer = TextNormalizer::new(&options.fallback_encoding)?;
        Ok(Self::build(options, normalizer))
    }

    fn build(options: ParseOptions, normalizer: TextNormalizer) -> Self {
        Self {
            analyzer: LayoutAnalyzer::new(options.layout.clone()),
            classifier: HeadingClassifier::new(options.headings.clone()),
            detector: TableDetector::with_config(options.tables.clone()),
            filter: RepetitionFilter::new(options.repetition.clone()),
            normalizer,
            options,
        }
    }

    /// Options in use.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Open and parse a PDF file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Extraction> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let backend = LopdfBackend::load_file(path)?;
        self.parse_backend(&backend)
    }

    /// Parse a PDF held in memory.
    pub fn parse_data(&self, data: &[u8]) -> Result<Extraction> {
        let backend = LopdfBackend::load_bytes(data)?;
        self.parse_backend(&backend)
    }

    /// Parse through any backend.
    pub fn parse_backend(&self, backend: &dyn PdfBackend) -> Result<Extraction> {
        let pages = backend
            .pages()
            .into_iter()
            .map(|(page_number, page_id)| self.parse_page(backend, page_number, page_id))
            .collect::<Result<Vec<_>>>()?;

        let pages = if self.options.remove_repetitions {
            self.filter.apply(&pages)
        } else {
            pages
        };

        log::debug!(
            "parsed PDF: {} pages, {} blocks",
            pages.len(),
            pages.iter().map(|p| p.blocks.len()).sum::<usize>()
        );

        Ok(Extraction::new(pages).with_metadata(backend.metadata()))
    }

    fn parse_page(
        &self,
        backend: &dyn PdfBackend,
        page_number: u32,
        page_id: PageId,
    ) -> Result<Page> {
        let spans = extract_page_spans(backend, page_number, page_id, &self.normalizer)?;

        let (tables, raw_blocks) = if self.options.detect_tables {
            self.detector.detect_in_blocks(spans.blocks)
        } else {
            (Vec::new(), spans.blocks)
        };

        let mut blocks = self.analyzer.analyze(&raw_blocks);
        if self.options.detect_headings {
            blocks = self.classifier.classify(&blocks);
        }
        if self.options.detect_tables {
            blocks = flag_table_like_blocks(&blocks);
            if !tables.is_empty() {
                log::debug!("page {}: {} tables detected", page_number, tables.len());
            }
            blocks.extend(tables.iter().map(|t| t.to_block()));
        }

        Ok(Page::new(page_number, blocks).with_size(spans.width, spans.height))
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for PdfParser {
    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn name(&self) -> &str {
        "pdf"
    }

    fn parse(&self, path: &Path) -> Result<Extraction> {
        self.parse_file(path)
    }

    fn parse_bytes(&self, bytes: &[u8]) -> Result<Extraction> {
        self.parse_data(bytes)
    }
}
