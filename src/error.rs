//! Error types for the tenderdoc library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tenderdoc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while parsing or chunking documents.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input path does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file extension is not handled by any registered parser.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// The document could not be read (damaged container, bad content stream, etc.).
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    /// The OCR tool is missing or exited unsuccessfully.
    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    /// A component was constructed with invalid settings.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Error during rendering (JSON).
    #[error("Rendering error: {0}")]
    Render(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::CorruptDocument(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            _ => Error::CorruptDocument(format!("DOCX container: {}", err)),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::CorruptDocument(format!("DOCX markup: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnsupportedFormat(".txt".to_string());
        assert_eq!(err.to_string(), "Unsupported file type: .txt");

        let err = Error::NotFound(PathBuf::from("missing.pdf"));
        assert_eq!(err.to_string(), "File not found: missing.pdf");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_zip_error_conversion() {
        let err: Error = zip::result::ZipError::FileNotFound.into();
        assert!(matches!(err, Error::CorruptDocument(_)));
    }
}
