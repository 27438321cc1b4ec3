//! Heading-anchored sectioning.

use uuid::Uuid;

use crate::model::{BlockType, Chunk, Page, PageBlock};

/// Title of the section collecting content before the first level-1 heading.
pub const PREAMBLE_TITLE: &str = "Preamble";

/// Groups page blocks into sections anchored at level-1 headings.
///
/// A level-1 heading closes the open section and opens a new one. Deeper
/// headings, paragraphs, list items and tables join the open section.
/// Content before the first level-1 heading is dropped unless
/// `allow_preamble` is set.
#[derive(Debug, Clone)]
pub struct DynamicChunker {
    /// Keep table blocks
    pub include_tables: bool,
    /// Deepest heading level kept as a nested heading
    pub max_heading_level: u8,
    /// Collect leading content into a level-0 "Preamble" section
    pub allow_preamble: bool,
}

impl DynamicChunker {
    /// Create a chunker with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include or skip table blocks.
    pub fn with_tables(mut self, include: bool) -> Self {
        self.include_tables = include;
        self
    }

    /// Set the deepest nested heading level.
    pub fn with_max_heading_level(mut self, level: u8) -> Self {
        self.max_heading_level = level;
        self
    }

    /// Keep content before the first level-1 heading.
    pub fn with_preamble(mut self, allow: bool) -> Self {
        self.allow_preamble = allow;
        self
    }

    /// Build sections from pages, in document order.
    pub fn build_chunks(&self, pages: &[Page]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut open: Option<OpenSection> = None;

        for page in pages {
            for block in &page.blocks {
                if block.block_type == BlockType::TableBlock && !self.include_tables {
                    continue;
                }
                let block = block.clone().with_page_number(page.page_number);

                if block.heading_level() == Some(1) {
                    if let Some(section) = open.take() {
                        chunks.push(section.finish());
                    }
                    open = Some(OpenSection::anchored(block));
                    continue;
                }

                match open.as_mut() {
                    Some(section) => {
                        if let Some(level) = block.heading_level() {
                            if level > self.max_heading_level {
                                log::debug!("heading level {} kept as section content", level);
                            }
                        }
                        section.blocks.push(block);
                    }
                    None if self.allow_preamble => open = Some(OpenSection::preamble(block)),
                    None => {}
                }
            }
        }

        if let Some(section) = open {
            chunks.push(section.finish());
        }
        log::debug!("dynamic chunker: {} sections", chunks.len());
        chunks
    }
}

impl Default for DynamicChunker {
    fn default() -> Self {
        Self {
            include_tables: true,
            max_heading_level: 6,
            allow_preamble: false,
        }
    }
}

struct OpenSection {
    title: String,
    level: u8,
    blocks: Vec<PageBlock>,
}

impl OpenSection {
    fn anchored(heading: PageBlock) -> Self {
        Self {
            title: heading.text.trim().to_string(),
            level: 1,
            blocks: vec![heading],
        }
    }

    fn preamble(first: PageBlock) -> Self {
        Self {
            title: PREAMBLE_TITLE.to_string(),
            level: 0,
            blocks: vec![first],
        }
    }

    fn finish(self) -> Chunk {
        let mut page_numbers: Vec<u32> = self.blocks.iter().filter_map(|b| b.page_number).collect();
        page_numbers.sort_unstable();
        page_numbers.dedup();

        // the anchor heading is the title, not body text
        let skip = usize::from(self.blocks.first().is_some_and(|b| b.heading_level() == Some(1)));
        let text = self.blocks[skip..]
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();

        Chunk {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            heading_level: self.level,
            text,
            blocks: self.blocks,
            page_numbers,
        }
    }
}
