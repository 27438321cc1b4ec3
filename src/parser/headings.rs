//! Heading classification from font statistics and lexical cues.
//!
//! Lexical patterns (article and chapter markers, section numbers, short
//! all-caps lines) win outright. Otherwise bold text at or above the page's
//! median size is a heading whose level follows its relative font size.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{BlockType, PageBlock};

static ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^art(?:\.|icolo)?\s*\d+").unwrap());

static CHAPTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:capo\s+[ivxlc]+\b|capitolo\s+\d+|titolo\s+\d+)").unwrap()
});

/// `1.2`, `1.2.`, `1.2.3 ` followed by text
static SUBSECTION_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+(?:\.\d+)*\.?\s+\S").unwrap());

/// `1.` followed by text
static SECTION_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s+\S").unwrap());

const BOLD_TOKENS: &[&str] = &["bold", "black", "heavy", "semibold"];

/// Heading classifier settings.
#[derive(Debug, Clone)]
pub struct HeadingOptions {
    /// Points above the median size that mark a top-level heading
    pub font_boost: f32,
    /// Deepest level assigned
    pub max_level: u8,
    /// Word limit for numbered headings
    pub max_numbered_words: usize,
    /// Word limit for all-caps headings
    pub max_caps_words: usize,
}

impl HeadingOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the font boost.
    pub fn with_font_boost(mut self, boost: f32) -> Self {
        self.font_boost = boost;
        self
    }

    /// Set the deepest heading level.
    pub fn with_max_level(mut self, level: u8) -> Self {
        self.max_level = level.max(1);
        self
    }
}

impl Default for HeadingOptions {
    fn default() -> Self {
        Self {
            font_boost: 1.5,
            max_level: 6,
            max_numbered_words: 15,
            max_caps_words: 8,
        }
    }
}

/// Font statistics of one page.
#[derive(Debug, Clone, Default)]
struct SizeProfile {
    median: Option<f32>,
    /// Distinct sizes (one decimal), largest first
    ranked: Vec<f32>,
}

impl SizeProfile {
    fn from_blocks(blocks: &[PageBlock]) -> Self {
        let mut sizes: Vec<f32> = blocks.iter().filter_map(|b| b.font_size).collect();
        if sizes.is_empty() {
            return Self::default();
        }
        sizes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = sizes.len() / 2;
        let median = if sizes.len() % 2 == 0 {
            (sizes[mid - 1] + sizes[mid]) / 2.0
        } else {
            sizes[mid]
        };

        let mut ranked: Vec<f32> = sizes.iter().map(|s| (s * 10.0).round() / 10.0).collect();
        ranked.dedup();
        ranked.reverse();

        Self {
            median: Some(median),
            ranked,
        }
    }

    /// 1-based rank of the ranked size closest to `size`.
    fn rank_of(&self, size: f32) -> usize {
        self.ranked
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - size)
                    .abs()
                    .partial_cmp(&(*b - size).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(idx, _)| idx + 1)
            .unwrap_or(1)
    }
}

/// Tags blocks as headings with levels.
#[derive(Debug, Clone, Default)]
pub struct HeadingClassifier {
    options: HeadingOptions,
}

impl HeadingClassifier {
    /// Create a classifier.
    pub fn new(options: HeadingOptions) -> Self {
        Self { options }
    }

    /// Classify one page's blocks.
    ///
    /// Returns blocks in the same order; only type and level change.
    /// Table blocks pass through untouched.
    pub fn classify(&self, blocks: &[PageBlock]) -> Vec<PageBlock> {
        let profile = SizeProfile::from_blocks(blocks);
        blocks
            .iter()
            .map(|block| self.classify_block(block, &profile))
            .collect()
    }

    fn classify_block(&self, block: &PageBlock, profile: &SizeProfile) -> PageBlock {
        if block.is_table() {
            return block.clone();
        }

        match self.heading_level(block, profile) {
            Some(level) => block
                .clone()
                .with_type(BlockType::Heading)
                .with_level(level.min(self.options.max_level).max(1)),
            None => {
                let block_type = if block.is_heading() {
                    BlockType::Paragraph
                } else {
                    block.block_type
                };
                block.clone().with_type(block_type).without_level()
            }
        }
    }

    fn heading_level(&self, block: &PageBlock, profile: &SizeProfile) -> Option<u8> {
        let text = block.text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(level) = self.pattern_level(text) {
            return Some(level);
        }

        let size = block.font_size?;
        let median = profile.median?;
        if !is_bold_font(block.font_name.as_deref()) || size < median {
            return None;
        }
        if size > median + self.options.font_boost {
            return Some(1);
        }
        let rank = profile.rank_of(size).min(self.options.max_level as usize);
        Some(rank as u8)
    }

    fn pattern_level(&self, text: &str) -> Option<u8> {
        if ARTICLE.is_match(text) {
            return Some(2);
        }
        if CHAPTER.is_match(text) {
            return Some(1);
        }

        let words = text.split_whitespace().count();
        if words <= self.options.max_numbered_words {
            if SUBSECTION_NUMBER.is_match(text) {
                return Some(2);
            }
            if SECTION_NUMBER.is_match(text) {
                return Some(1);
            }
        }

        if words <= self.options.max_caps_words && is_all_caps(text) {
            return Some(1);
        }
        None
    }
}

/// Check whether a font name carries a bold weight token.
pub fn is_bold_font(font_name: Option<&str>) -> bool {
    font_name.is_some_and(|name| {
        let lower = name.to_lowercase();
        BOLD_TOKENS.iter().any(|token| lower.contains(token))
    })
}

/// At least three letters, none of them lowercase.
fn is_all_caps(text: &str) -> bool {
    let mut letters = 0;
    for c in text.chars().filter(|c| c.is_alphabetic()) {
        if c.is_lowercase() {
            return false;
        }
        letters += 1;
    }
    letters >= 3
}
