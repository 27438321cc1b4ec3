//! Document format detection.
//!
//! Dispatch is driven by file extension; the magic-byte checks are used to
//! give a clearer error when a file's content disagrees with its name.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Document formats understood by the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// Portable Document Format
    Pdf,
    /// Office Open XML word-processing document
    Docx,
}

impl DocumentFormat {
    /// Map a file extension (with or without the leading dot, any case).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" | "doc" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Canonical lowercase extension (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf => write!(f, "PDF"),
            Self::Docx => write!(f, "DOCX"),
        }
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
/// ZIP local file header (DOCX is a ZIP container).
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Lowercase extension of `path` including the leading dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Detect the document format from a path's extension.
///
/// Returns `Error::UnsupportedFormat` for anything other than
/// `.pdf`, `.docx` or `.doc`.
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<DocumentFormat> {
    let ext = extension_of(path.as_ref());
    DocumentFormat::from_extension(&ext).ok_or(Error::UnsupportedFormat(ext))
}

/// Sniff the document format from leading bytes.
pub fn detect_format_from_bytes(data: &[u8]) -> Option<DocumentFormat> {
    if data.starts_with(PDF_MAGIC) {
        Some(DocumentFormat::Pdf)
    } else if data.starts_with(ZIP_MAGIC) {
        Some(DocumentFormat::Docx)
    } else {
        None
    }
}

/// Check that the file content matches the expected format.
pub fn content_matches<P: AsRef<Path>>(path: P, expected: DocumentFormat) -> Result<bool> {
    let mut header = [0u8; 8];
    let mut file = File::open(path)?;
    let read = file.read(&mut header)?;
    Ok(detect_format_from_bytes(&header[..read]) == Some(expected))
}
