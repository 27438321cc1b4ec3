//! Text normalization.
//!
//! Turns raw bytes or already-decoded strings into clean Unicode: charset
//! detection, mojibake repair, ligature expansion, width and quote folding,
//! line-break unification, control-character removal and NFC.

use std::borrow::Cow;
use std::sync::LazyLock;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};

/// ANSI terminal escape sequences.
static TERMINAL_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").unwrap());

/// Non-whitespace runs (mojibake is repaired one word at a time).
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").unwrap());

const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

/// Raw input accepted by [`TextNormalizer::normalize`].
#[derive(Debug, Clone, Copy)]
pub enum RawText<'a> {
    /// Undecoded bytes of unknown charset
    Bytes(&'a [u8]),
    /// Already-decoded text
    Str(&'a str),
}

impl<'a> From<&'a [u8]> for RawText<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        RawText::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for RawText<'a> {
    fn from(text: &'a str) -> Self {
        RawText::Str(text)
    }
}

/// Charset-aware text cleaner.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    fallback: &'static Encoding,
    uncurl_quotes: bool,
    fix_character_width: bool,
}

impl TextNormalizer {
    /// Create a normalizer whose last-resort decoding uses `fallback_label`
    /// (a WHATWG encoding label such as "utf-8" or "windows-1252").
    pub fn new(fallback_label: &str) -> Result<Self> {
        let fallback = Encoding::for_label(fallback_label.trim().as_bytes()).ok_or_else(|| {
            Error::Configuration(format!("unknown fallback encoding: {}", fallback_label))
        })?;
        Ok(Self {
            fallback,
            ..Self::default()
        })
    }

    /// Enable or disable folding of curly quotes to ASCII quotes.
    pub fn with_uncurl_quotes(mut self, enabled: bool) -> Self {
        self.uncurl_quotes = enabled;
        self
    }

    /// Enable or disable folding of fullwidth ASCII forms.
    pub fn with_fix_character_width(mut self, enabled: bool) -> Self {
        self.fix_character_width = enabled;
        self
    }

    /// Name of the fallback encoding.
    pub fn fallback_encoding(&self) -> &'static str {
        self.fallback.name()
    }

    /// Normalize either bytes or text.
    pub fn normalize<'a>(&self, raw: impl Into<RawText<'a>>) -> String {
        match raw.into() {
            RawText::Bytes(bytes) => self.normalize_bytes(bytes),
            RawText::Str(text) => self.normalize_str(text),
        }
    }

    /// Decode bytes of unknown charset, then clean the text.
    pub fn normalize_bytes(&self, bytes: &[u8]) -> String {
        let decoded = self.decode(bytes);
        self.normalize_str(&decoded)
    }

    /// Clean already-decoded text.
    pub fn normalize_str(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut result = TERMINAL_ESCAPE.replace_all(text, "").into_owned();
        result = repair_mojibake(&result);
        result = fix_c1_controls(&result);
        result = unify_line_breaks(&result);

        let mut out = String::with_capacity(result.len());
        for c in result.chars() {
            if let Some((_, replacement)) = LIGATURES.iter().find(|(lig, _)| *lig == c) {
                out.push_str(replacement);
                continue;
            }
            let c = if self.fix_character_width {
                fold_width(c)
            } else {
                c
            };
            let c = if self.uncurl_quotes { uncurl(c) } else { c };
            if is_removable_control(c) {
                continue;
            }
            out.push(c);
        }

        out.nfc().collect()
    }

    fn decode<'b>(&self, bytes: &'b [u8]) -> Cow<'b, str> {
        if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
            let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
            return text;
        }

        if let Ok(text) = std::str::from_utf8(bytes) {
            return Cow::Borrowed(text);
        }

        let mut detector = EncodingDetector::new();
        detector.feed(bytes, true);
        let guessed = detector.guess(None, true);
        let (text, had_errors) = guessed.decode_without_bom_handling(bytes);
        if !had_errors {
            log::debug!("normalizer: decoded input as {}", guessed.name());
            return text;
        }

        log::debug!(
            "normalizer: {} failed, falling back to {}",
            guessed.name(),
            self.fallback.name()
        );
        let (text, _) = self.fallback.decode_without_bom_handling(bytes);
        text
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self {
            fallback: UTF_8,
            uncurl_quotes: true,
            fix_character_width: true,
        }
    }
}

/// Re-decode words that are UTF-8 bytes mis-read as Windows-1252.
fn repair_mojibake(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }
    WORD.replace_all(text, |caps: &Captures| {
        let word = &caps[0];
        repair_word(word).unwrap_or_else(|| word.to_string())
    })
    .into_owned()
}

fn repair_word(word: &str) -> Option<String> {
    if word.is_ascii() {
        return None;
    }
    let (bytes, _, unmappable) = WINDOWS_1252.encode(word);
    if unmappable {
        return None;
    }
    let repaired = std::str::from_utf8(&bytes).ok()?;
    if repaired == word || repaired.chars().count() >= word.chars().count() {
        return None;
    }
    Some(repaired.to_string())
}

/// Map stray C1 control characters to their Windows-1252 meaning.
fn fix_c1_controls(text: &str) -> String {
    if !text.chars().any(|c| ('\u{80}'..='\u{9F}').contains(&c)) {
        return text.to_string();
    }
    text.chars()
        .map(|c| {
            if ('\u{80}'..='\u{9F}').contains(&c) {
                let byte = [c as u32 as u8];
                let (decoded, _) = WINDOWS_1252.decode_without_bom_handling(&byte);
                decoded.chars().next().unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

fn unify_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace(['\r', '\u{2028}', '\u{2029}', '\u{85}'], "\n")
}

fn fold_width(c: char) -> char {
    match c {
        '\u{3000}' => ' ',
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        _ => c,
    }
}

fn uncurl(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
        _ => c,
    }
}

fn is_removable_control(c: char) -> bool {
    match c {
        '\n' | '\t' => false,
        '\u{FEFF}' | '\u{200B}' => true,
        _ => c.is_control(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_fallback_label() {
        let err = TextNormalizer::new("no-such-charset").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(
            TextNormalizer::new("latin1").unwrap().fallback_encoding(),
            "windows-1252"
        );
    }

    #[test]
    fn test_utf8_bytes_pass_through() {
        let normalizer = TextNormalizer::default();
        assert_eq!(
            normalizer.normalize_bytes("Capitolato d'oneri".as_bytes()),
            "Capitolato d'oneri"
        );
    }

    #[test]
    fn test_bom_is_stripped() {
        let normalizer = TextNormalizer::default();
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Bando");
        assert_eq!(normalizer.normalize_bytes(&bytes), "Bando");
    }

    #[test]
    fn test_legacy_bytes_are_decoded() {
        let normalizer = TextNormalizer::default();
        let bytes = b"La qualit\xe0 del servizio \xe8 garantita perch\xe9 la citt\xe0 richiede pi\xf9 attivit\xe0";
        assert_eq!(
            normalizer.normalize_bytes(bytes),
            "La qualità del servizio è garantita perché la città richiede più attività"
        );
    }

    #[test]
    fn test_mojibake_repair() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize_str("perchÃ© qualitÃ¨"), "perché qualitè");
        assert_eq!(normalizer.normalize_str("â‚¬ 1.000"), "€ 1.000");
    }

    #[test]
    fn test_legitimate_accents_untouched() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize_str("Qualità è così"), "Qualità è così");
    }

    #[test]
    fn test_ligatures_and_quotes() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize_str("\u{FB01}nale"), "finale");
        assert_eq!(normalizer.normalize_str("dell\u{2019}offerta"), "dell'offerta");

        let keep_quotes = TextNormalizer::default().with_uncurl_quotes(false);
        assert_eq!(
            keep_quotes.normalize_str("dell\u{2019}offerta"),
            "dell\u{2019}offerta"
        );
    }

    #[test]
    fn test_nfc_composition() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize_str("e\u{0301}"), "é");
    }

    #[test]
    fn test_control_chars_and_line_breaks() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize_str("a\r\nb\rc\u{0007}"), "a\nb\nc");
        assert_eq!(normalizer.normalize_str("\x1b[1mLotto\x1b[0m"), "Lotto");
    }

    #[test]
    fn test_fullwidth_folding() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize_str("ＬＯＴ１"), "LOT1");
    }

    #[test]
    fn test_normalize_dispatch() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize("abc"), "abc");
        assert_eq!(normalizer.normalize(&b"abc"[..]), "abc");
        assert_eq!(normalizer.normalize(""), "");
    }
}
