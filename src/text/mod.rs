//! Text-level utilities: normalization and language detection.

mod language;
mod normalizer;

pub use language::{LanguageDetector, WhatlangDetector, UNKNOWN_LANGUAGE};
pub use normalizer::{RawText, TextNormalizer};
