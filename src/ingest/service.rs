//! Ingestion service: parser dispatch, OCR staging and language detection.

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use tempfile::TempDir;
use uuid::Uuid;

use crate::detect::extension_of;
use crate::error::{Error, Result};
use crate::model::{joined_text, Page, ParsedDocument};
use crate::ocr::{OcrEngine, OcrMyPdf, DEFAULT_TEXT_THRESHOLD};
use crate::parser::ParseOptions;
use crate::text::{LanguageDetector, WhatlangDetector, UNKNOWN_LANGUAGE};

use super::{DocumentParser, Extraction, ParserRegistry};

/// What to do when the OCR tool is missing or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OcrFailurePolicy {
    /// Fail the parse with `Error::OcrUnavailable`
    #[default]
    Abort,
    /// Log a warning and parse the original file
    FallBack,
}

/// Options for [`IngestionService`].
#[derive(Debug, Clone)]
pub struct IngestionOptions {
    /// Parser options
    pub parse: ParseOptions,

    /// Allow OCR of scanned PDFs
    pub enable_ocr: bool,

    /// OCR every PDF regardless of its text content
    pub force_ocr: bool,

    /// Minimum extractable characters before a PDF counts as text-based
    pub text_threshold: usize,

    /// Behavior on OCR failure
    pub ocr_policy: OcrFailurePolicy,

    /// Parse independent documents in parallel in batch mode
    pub parallel: bool,
}

impl IngestionOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set parser options.
    pub fn with_parse_options(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    /// Enable or disable OCR.
    pub fn with_ocr(mut self, enabled: bool) -> Self {
        self.enable_ocr = enabled;
        self
    }

    /// Force OCR on every PDF.
    pub fn with_force_ocr(mut self, force: bool) -> Self {
        self.force_ocr = force;
        self
    }

    /// Set the OCR text threshold.
    pub fn with_text_threshold(mut self, threshold: usize) -> Self {
        self.text_threshold = threshold;
        self
    }

    /// Set the OCR failure policy.
    pub fn with_ocr_policy(mut self, policy: OcrFailurePolicy) -> Self {
        self.ocr_policy = policy;
        self
    }

    /// Enable or disable parallel batch parsing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            enable_ocr: true,
            force_ocr: false,
            text_threshold: DEFAULT_TEXT_THRESHOLD,
            ocr_policy: OcrFailurePolicy::default(),
            parallel: true,
        }
    }
}

/// Turns a file on disk into a [`ParsedDocument`].
///
/// The parser registry, OCR engine and language detector are injected; the
/// service holds no other state and can be shared across threads.
#[derive(Clone)]
pub struct IngestionService {
    options: IngestionOptions,
    registry: ParserRegistry,
    ocr: Option<Arc<dyn OcrEngine>>,
    detector: Option<Arc<dyn LanguageDetector>>,
}

impl IngestionService {
    /// Create a service with the default parsers, `ocrmypdf` and whatlang.
    pub fn new(options: IngestionOptions) -> Result<Self> {
        let registry = ParserRegistry::with_options(&options.parse)?;
        Ok(Self {
            options,
            registry,
            ocr: Some(Arc::new(OcrMyPdf::new())),
            detector: Some(Arc::new(WhatlangDetector::new())),
        })
    }

    /// Replace the parser registry.
    pub fn with_registry(mut self, registry: ParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the OCR engine (`None` disables OCR).
    pub fn with_ocr_engine(mut self, engine: Option<Arc<dyn OcrEngine>>) -> Self {
        self.ocr = engine;
        self
    }

    /// Replace the language detector (`None` reports "unknown").
    pub fn with_language_detector(mut self, detector: Option<Arc<dyn LanguageDetector>>) -> Self {
        self.detector = detector;
        self
    }

    /// Options in use.
    pub fn options(&self) -> &IngestionOptions {
        &self.options
    }

    /// Parser registry in use.
    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    /// Parse one document.
    ///
    /// `doc_id` defaults to a random UUID.
    pub fn parse_document<P: AsRef<Path>>(&self, path: P, doc_id: Option<&str>) -> Result<ParsedDocument> {
        let path = path.as_ref();
        let parser = self.registry.parser_for(path)?;
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }

        let extension = extension_of(path);
        let extraction = if extension == ".pdf" {
            self.extract_pdf(path, parser.as_ref())?
        } else {
            parser.parse(path)?
        };

        let language = self.detect_language(&extraction.pages);
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        log::info!(
            "parsed {}: {} pages, language {}",
            filename,
            extraction.pages.len(),
            language
        );

        Ok(ParsedDocument {
            doc_id: doc_id
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            filename,
            extension,
            language,
            total_pages: extraction.pages.len(),
            pages: extraction.pages,
            metadata: extraction.metadata,
        })
    }

    /// Parse several independent documents; results keep input order.
    pub fn parse_documents<P>(&self, paths: &[P]) -> Vec<Result<ParsedDocument>>
    where
        P: AsRef<Path> + Sync,
    {
        if self.options.parallel {
            paths.par_iter().map(|p| self.parse_document(p, None)).collect()
        } else {
            paths.iter().map(|p| self.parse_document(p, None)).collect()
        }
    }

    /// Language of the concatenated block text.
    pub fn detect_language(&self, pages: &[Page]) -> String {
        let text = joined_text(pages);
        match &self.detector {
            Some(detector) if !text.trim().is_empty() => detector.detect(&text),
            _ => UNKNOWN_LANGUAGE.to_string(),
        }
    }

    fn extract_pdf(&self, path: &Path, parser: &dyn DocumentParser) -> Result<Extraction> {
        let engine = match &self.ocr {
            Some(engine) if self.options.enable_ocr => engine,
            _ => return parser.parse(path),
        };

        let needs_ocr =
            self.options.force_ocr || engine.needs_ocr(path, self.options.text_threshold)?;
        if !needs_ocr {
            return parser.parse(path);
        }

        // removed when `staging` drops, on every return path
        let staging = TempDir::new()?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        let output = staging.path().join(format!("ocr_{}", name));

        match engine.apply_ocr(path, &output) {
            Ok(()) => parser.parse(&output),
            Err(e) if self.options.ocr_policy == OcrFailurePolicy::FallBack => {
                log::warn!("OCR failed for {}, using original: {}", path.display(), e);
                parser.parse(path)
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for IngestionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionService")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("ocr", &self.ocr.is_some())
            .field("detector", &self.detector.is_some())
            .finish()
    }
}
