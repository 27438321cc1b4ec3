//! OCR gate for image-only PDFs.
//!
//! A PDF whose extractable text is shorter than a threshold is treated as
//! scanned and handed to an external OCR tool. The tool itself is opaque:
//! [`OcrMyPdf`] shells out to `ocrmypdf` and blocks until it exits.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};
use crate::parser::{LopdfBackend, PdfBackend};

/// Default minimum number of extractable characters for a text PDF.
pub const DEFAULT_TEXT_THRESHOLD: usize = 200;

/// Decides whether a PDF needs OCR and produces an OCR'd copy.
pub trait OcrEngine: Send + Sync {
    /// Whether `path` holds fewer than `text_threshold` extractable characters.
    fn needs_ocr(&self, path: &Path, text_threshold: usize) -> Result<bool>;

    /// Write an OCR'd copy of `input` to `output`.
    fn apply_ocr(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Total characters of library-extracted text over all pages.
///
/// Pages whose text cannot be extracted count as empty.
pub fn count_text_chars(backend: &dyn PdfBackend) -> usize {
    backend
        .pages()
        .keys()
        .map(|&page_number| match backend.page_text(page_number) {
            Ok(text) => text.chars().count(),
            Err(e) => {
                log::debug!("page {}: no extractable text ({})", page_number, e);
                0
            }
        })
        .sum()
}

/// Whether a backend's document falls under the text threshold.
pub fn is_mostly_image(backend: &dyn PdfBackend, text_threshold: usize) -> bool {
    count_text_chars(backend) < text_threshold
}

/// [`OcrEngine`] running the `ocrmypdf` command-line tool.
#[derive(Debug, Clone)]
pub struct OcrMyPdf {
    /// Executable name or path
    pub program: PathBuf,
    /// Arguments inserted before the default flags
    pub extra_args: Vec<String>,
}

impl OcrMyPdf {
    /// Create an engine invoking `ocrmypdf` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Add extra arguments (e.g., `["-l", "ita"]`).
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Full argument list for one run.
    pub fn command_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args = self.extra_args.clone();
        args.extend(
            ["--deskew", "--optimize", "3", "--output-type", "pdf"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.push(input.to_string_lossy().into_owned());
        args.push(output.to_string_lossy().into_owned());
        args
    }

    /// Check whether the executable can be started.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Default for OcrMyPdf {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ocrmypdf"),
            extra_args: Vec::new(),
        }
    }
}

impl OcrEngine for OcrMyPdf {
    fn needs_ocr(&self, path: &Path, text_threshold: usize) -> Result<bool> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let backend = LopdfBackend::load_file(path)?;
        let chars = count_text_chars(&backend);
        log::debug!(
            "{}: {} extractable chars (threshold {})",
            path.display(),
            chars,
            text_threshold
        );
        Ok(chars < text_threshold)
    }

    fn apply_ocr(&self, input: &Path, output: &Path) -> Result<()> {
        log::info!("running {} on {}", self.program.display(), input.display());
        let result = Command::new(&self.program)
            .args(self.command_args(input, output))
            .output()
            .map_err(|e| {
                Error::OcrUnavailable(format!(
                    "cannot run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::OcrUnavailable(format!(
                "{} failed with {}: {}",
                self.program.display(),
                result.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_args_order() {
        let engine = OcrMyPdf::new().with_extra_args(["-l", "ita"]);
        let args = engine.command_args(Path::new("in.pdf"), Path::new("out.pdf"));
        assert_eq!(
            args,
            vec![
                "-l", "ita", "--deskew", "--optimize", "3", "--output-type", "pdf", "in.pdf",
                "out.pdf"
            ]
        );
    }

    #[test]
    fn test_missing_executable_is_ocr_unavailable() {
        let engine = OcrMyPdf::new().with_program("/nonexistent/ocrmypdf-binary");
        assert!(!engine.is_available());
        let err = engine
            .apply_ocr(Path::new("in.pdf"), Path::new("out.pdf"))
            .unwrap_err();
        assert!(matches!(err, Error::OcrUnavailable(_)));
    }

    #[test]
    fn test_needs_ocr_missing_file() {
        let err = OcrMyPdf::new()
            .needs_ocr(Path::new("/nonexistent/scan.pdf"), DEFAULT_TEXT_THRESHOLD)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_ocr_unavailable() {
        let engine = OcrMyPdf::new().with_program("false");
        let err = engine
            .apply_ocr(Path::new("in.pdf"), Path::new("out.pdf"))
            .unwrap_err();
        assert!(matches!(err, Error::OcrUnavailable(msg) if msg.contains("failed")));
    }
}
