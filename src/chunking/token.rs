//! Token-bounded, overlapping windows over sections.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{Chunk, TokenChunk};

use super::metadata::extract_metadata;

/// Splits text into tokens.
pub trait Tokenizer: Send + Sync {
    /// Tokens of `text`, in order.
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Splits on Unicode whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }
}

/// Window sizes for [`TokenChunker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenChunkerConfig {
    /// Maximum tokens per window
    pub max_tokens: usize,
    /// Minimum tokens for a window after the first
    pub min_tokens: usize,
    /// Tokens shared by consecutive windows
    pub overlap_tokens: usize,
}

impl TokenChunkerConfig {
    /// Create a configuration.
    pub fn new(max_tokens: usize, min_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            max_tokens,
            min_tokens,
            overlap_tokens,
        }
    }

    /// Check `0 < min <= max` and `overlap < max`.
    pub fn validate(&self) -> Result<()> {
        if self.min_tokens == 0 || self.max_tokens == 0 {
            return Err(Error::Configuration("token sizes must be positive".into()));
        }
        if self.min_tokens > self.max_tokens {
            return Err(Error::Configuration(format!(
                "min_tokens ({}) cannot exceed max_tokens ({})",
                self.min_tokens, self.max_tokens
            )));
        }
        if self.overlap_tokens >= self.max_tokens {
            return Err(Error::Configuration(format!(
                "overlap_tokens ({}) must be smaller than max_tokens ({})",
                self.overlap_tokens, self.max_tokens
            )));
        }
        Ok(())
    }
}

impl Default for TokenChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 800,
            min_tokens: 400,
            overlap_tokens: 120,
        }
    }
}

/// Token windows `(start, end)` over `n` tokens.
///
/// Windows advance by `max - overlap`. A trailing window shorter than
/// `min_tokens` is not emitted, so the last tokens of a long section can be
/// left out of every window.
pub fn build_spans(n: usize, config: &TokenChunkerConfig) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;

    while start < n {
        let end = (start + config.max_tokens).min(n);
        if end - start < config.min_tokens && start != 0 {
            break;
        }
        spans.push((start, end));
        if end == n {
            break;
        }
        start = end.saturating_sub(config.overlap_tokens);
    }

    spans
}

/// Re-chunks sections into overlapping token windows with metadata.
#[derive(Clone)]
pub struct TokenChunker {
    config: TokenChunkerConfig,
    tokenizer: Arc<dyn Tokenizer>,
}

impl TokenChunker {
    /// Create a chunker with the whitespace tokenizer.
    ///
    /// Fails with `Error::Configuration` on inconsistent window sizes.
    pub fn new(config: TokenChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tokenizer: Arc::new(WhitespaceTokenizer),
        })
    }

    /// Use a different tokenizer.
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &TokenChunkerConfig {
        &self.config
    }

    /// Windows of every section, in section order.
    pub fn chunk(&self, chunks: &[Chunk]) -> Vec<TokenChunk> {
        chunks.iter().flat_map(|c| self.chunk_one(c)).collect()
    }

    /// Windows of one section.
    pub fn chunk_one(&self, chunk: &Chunk) -> Vec<TokenChunk> {
        let tokens = self.tokenizer.tokenize(&chunk.text);
        let section_path = section_path(chunk);

        build_spans(tokens.len(), &self.config)
            .into_iter()
            .filter_map(|(start, end)| {
                let text = tokens[start..end].join(" ").trim().to_string();
                if text.is_empty() {
                    return None;
                }
                Some(TokenChunk {
                    id: format!("{}:{}-{}", chunk.id, start, end),
                    metadata: extract_metadata(&chunk.title, &text),
                    text,
                    section_path: section_path.clone(),
                    page_numbers: chunk.page_numbers.clone(),
                    source_chunk_id: chunk.id.clone(),
                })
            })
            .collect()
    }
}

impl Default for TokenChunker {
    fn default() -> Self {
        Self {
            config: TokenChunkerConfig::default(),
            tokenizer: Arc::new(WhitespaceTokenizer),
        }
    }
}

impl std::fmt::Debug for TokenChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenChunker")
            .field("config", &self.config)
            .finish()
    }
}

/// Section title followed by the distinct heading texts of the section.
pub fn section_path(chunk: &Chunk) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let title = chunk.title.trim();
    if !title.is_empty() {
        parts.push(title);
    }
    for heading in chunk.headings() {
        let text = heading.text.trim();
        if !text.is_empty() && !parts.contains(&text) {
            parts.push(text);
        }
    }
    parts.join(" > ")
}
