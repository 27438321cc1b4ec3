//! Parsing options and configuration.

use super::headings::HeadingOptions;
use super::layout::LayoutOptions;
use super::repetition::RepetitionOptions;
use super::table_detector::TableDetectorConfig;

/// Options for parsing documents.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Tag headings from font statistics and lexical cues
    pub detect_headings: bool,

    /// Detect tables from span alignment and flag table-like text
    pub detect_tables: bool,

    /// Remove running headers, footers and repeated boilerplate
    pub remove_repetitions: bool,

    /// Last-resort encoding label for undecodable text
    pub fallback_encoding: String,

    /// Block reconstruction tuning
    pub layout: LayoutOptions,

    /// Heading classifier tuning
    pub headings: HeadingOptions,

    /// Stream-mode table detector tuning
    pub tables: TableDetectorConfig,

    /// Repetition filter tuning
    pub repetition: RepetitionOptions,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable heading detection.
    pub fn with_headings(mut self, enabled: bool) -> Self {
        self.detect_headings = enabled;
        self
    }

    /// Enable or disable table detection.
    pub fn with_tables(mut self, enabled: bool) -> Self {
        self.detect_tables = enabled;
        self
    }

    /// Enable or disable header/footer and boilerplate removal.
    pub fn with_repetition_filter(mut self, enabled: bool) -> Self {
        self.remove_repetitions = enabled;
        self
    }

    /// Set the fallback encoding label (e.g., "windows-1252").
    pub fn with_fallback_encoding(mut self, label: impl Into<String>) -> Self {
        self.fallback_encoding = label.into();
        self
    }

    /// Set layout options.
    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    /// Set heading options.
    pub fn with_heading_options(mut self, headings: HeadingOptions) -> Self {
        self.headings = headings;
        self
    }

    /// Set repetition filter options.
    pub fn with_repetition_options(mut self, repetition: RepetitionOptions) -> Self {
        self.repetition = repetition;
        self
    }

    /// Raw extraction: no heading, table or repetition passes.
    pub fn raw() -> Self {
        Self {
            detect_headings: false,
            detect_tables: false,
            remove_repetitions: false,
            ..Self::default()
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            detect_headings: true,
            detect_tables: true,
            remove_repetitions: true,
            fallback_encoding: "utf-8".to_string(),
            layout: LayoutOptions::default(),
            headings: HeadingOptions::default(),
            tables: TableDetectorConfig::default(),
            repetition: RepetitionOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ParseOptions::default();
        assert!(options.detect_headings);
        assert!(options.detect_tables);
        assert!(options.remove_repetitions);
        assert_eq!(options.fallback_encoding, "utf-8");
        assert_eq!(options.layout.line_gap_multiplier, 0.8);
        assert_eq!(options.headings.font_boost, 1.5);
    }

    #[test]
    fn test_builder() {
        let options = ParseOptions::new()
            .with_headings(false)
            .with_tables(false)
            .with_fallback_encoding("latin1");
        assert!(!options.detect_headings);
        assert!(!options.detect_tables);
        assert_eq!(options.fallback_encoding, "latin1");

        let raw = ParseOptions::raw();
        assert!(!raw.remove_repetitions);
    }
}
