//! Language detection.
//!
//! Detection is a pluggable strategy: the ingestion service is handed a
//! [`LanguageDetector`] at construction time and never reaches for a
//! process-wide instance.

/// Language code returned when nothing can be detected.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Identifies the language of a text sample.
pub trait LanguageDetector: Send + Sync {
    /// Return an ISO 639-1 code (e.g., "it") or [`UNKNOWN_LANGUAGE`].
    fn detect(&self, text: &str) -> String;
}

/// Statistical trigram detector backed by `whatlang`.
#[derive(Debug, Clone)]
pub struct WhatlangDetector {
    /// Maximum number of characters inspected
    pub max_chars: usize,
    /// Report "unknown" unless whatlang flags the result as reliable
    pub require_reliable: bool,
}

impl WhatlangDetector {
    /// Create a detector with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inspection window.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Require a reliable detection.
    pub fn with_require_reliable(mut self, require: bool) -> Self {
        self.require_reliable = require;
        self
    }
}

impl Default for WhatlangDetector {
    fn default() -> Self {
        Self {
            max_chars: 5000,
            require_reliable: false,
        }
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> String {
        let sample: String = text
            .chars()
            .take(self.max_chars)
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        if sample.trim().is_empty() {
            return UNKNOWN_LANGUAGE.to_string();
        }

        match whatlang::detect(&sample) {
            Some(info) if info.is_reliable() || !self.require_reliable => {
                let code = iso639_1(info.lang().code());
                log::debug!(
                    "language: {} (confidence {:.2})",
                    code,
                    info.confidence()
                );
                code.to_string()
            }
            _ => UNKNOWN_LANGUAGE.to_string(),
        }
    }
}

/// Convert an ISO 639-3 code to ISO 639-1 where a two-letter code exists.
fn iso639_1(code3: &str) -> &str {
    match code3 {
        "ita" => "it",
        "eng" => "en",
        "fra" => "fr",
        "deu" => "de",
        "spa" => "es",
        "por" => "pt",
        "nld" => "nl",
        "ron" => "ro",
        "pol" => "pl",
        "ces" => "cs",
        "slk" => "sk",
        "slv" => "sl",
        "hrv" => "hr",
        "srp" => "sr",
        "bul" => "bg",
        "ell" => "el",
        "hun" => "hu",
        "fin" => "fi",
        "swe" => "sv",
        "dan" => "da",
        "nob" => "nb",
        "est" => "et",
        "lav" => "lv",
        "lit" => "lt",
        "rus" => "ru",
        "ukr" => "uk",
        "tur" => "tr",
        "ara" => "ar",
        "heb" => "he",
        "cmn" => "zh",
        "jpn" => "ja",
        "kor" => "ko",
        "lat" => "la",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_is_unknown() {
        let detector = WhatlangDetector::new();
        assert_eq!(detector.detect(""), UNKNOWN_LANGUAGE);
        assert_eq!(detector.detect("  \n "), UNKNOWN_LANGUAGE);
    }

    #[test]
    fn test_detects_italian() {
        let detector = WhatlangDetector::new();
        let text = "La stazione appaltante indice una procedura aperta per l'affidamento \
                    del servizio di manutenzione degli impianti. Le offerte dovranno \
                    pervenire entro il termine indicato nel presente disciplinare di gara.";
        assert_eq!(detector.detect(text), "it");
    }

    #[test]
    fn test_detects_english() {
        let detector = WhatlangDetector::new();
        let text = "The contracting authority invites tenders for the maintenance of the \
                    heating systems. Offers must be submitted before the deadline stated \
                    in the contract notice.";
        assert_eq!(detector.detect(text), "en");
    }

    #[test]
    fn test_iso_mapping() {
        assert_eq!(iso639_1("ita"), "it");
        assert_eq!(iso639_1("epo"), "epo");
    }

    #[test]
    fn test_trait_object() {
        struct Fixed;
        impl LanguageDetector for Fixed {
            fn detect(&self, _text: &str) -> String {
                "it".into()
            }
        }
        let detector: Box<dyn LanguageDetector> = Box::new(Fixed);
        assert_eq!(detector.detect("anything"), "it");
    }
}
