//! Removal of running headers, footers and repeated boilerplate.
//!
//! Blocks are compared by signature: whitespace-collapsed text, lowercase
//! font name and font size rounded to one decimal. Blocks are removed, never
//! merged, and surviving blocks keep their order.

use std::collections::{HashMap, HashSet};

use crate::model::{Page, PageBlock};

/// Settings for [`RepetitionFilter`].
#[derive(Debug, Clone)]
pub struct RepetitionOptions {
    /// Fraction of the page height treated as header or footer band
    pub margin_ratio: f32,
    /// Distinct pages a header/footer must appear on to be removed
    pub header_footer_min_pages: usize,
    /// Occurrences anywhere in the document that mark boilerplate
    pub global_min_occurrences: usize,
    /// Measure the bands against the page size instead of the lowest block
    pub use_page_size: bool,
}

impl RepetitionOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header/footer band.
    pub fn with_margin_ratio(mut self, ratio: f32) -> Self {
        self.margin_ratio = ratio;
        self
    }

    /// Set the global repetition threshold.
    pub fn with_global_min_occurrences(mut self, n: usize) -> Self {
        self.global_min_occurrences = n;
        self
    }

    /// Use the page height, when known, as the band reference.
    pub fn with_page_size(mut self, enabled: bool) -> Self {
        self.use_page_size = enabled;
        self
    }
}

impl Default for RepetitionOptions {
    fn default() -> Self {
        Self {
            margin_ratio: 0.1,
            header_footer_min_pages: 2,
            global_min_occurrences: 3,
            use_page_size: false,
        }
    }
}

/// Block identity used to spot repetitions.
pub fn block_signature(block: &PageBlock) -> String {
    let text = block.text.split_whitespace().collect::<Vec<_>>().join(" ");
    let font = block
        .font_name
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();
    let size = block
        .font_size
        .map(|s| format!("{:.1}", s))
        .unwrap_or_default();
    format!("{}|{}|{}", text, font, size)
}

#[derive(Debug, Clone, Copy)]
struct Band {
    header_limit: f32,
    footer_limit: f32,
}

impl Band {
    fn is_header(&self, block: &PageBlock) -> bool {
        block.top().is_some_and(|y0| y0 <= self.header_limit)
    }

    fn is_footer(&self, block: &PageBlock) -> bool {
        block.bottom().is_some_and(|y1| y1 >= self.footer_limit)
    }
}

/// Header/footer and boilerplate remover.
#[derive(Debug, Clone, Default)]
pub struct RepetitionFilter {
    options: RepetitionOptions,
}

impl RepetitionFilter {
    /// Create a filter.
    pub fn new(options: RepetitionOptions) -> Self {
        Self { options }
    }

    /// Run both passes: header/footer removal, then global pruning.
    pub fn apply(&self, pages: &[Page]) -> Vec<Page> {
        let pages = self.remove_headers_footers(pages);
        self.drop_global_repeats(&pages)
    }

    /// Bands span from the top of the page to the bottom of the lowest
    /// block, or to the page height when `use_page_size` is set.
    fn band(&self, page: &Page) -> Option<Band> {
        let lowest = || {
            page.blocks
                .iter()
                .filter_map(PageBlock::bottom)
                .fold(0.0, f32::max)
        };
        let height = if self.options.use_page_size {
            page.height.filter(|h| *h > 0.0).unwrap_or_else(lowest)
        } else {
            lowest()
        };
        (height > 0.0).then(|| Band {
            header_limit: self.options.margin_ratio * height,
            footer_limit: (1.0 - self.options.margin_ratio) * height,
        })
    }

    /// Drop blocks repeated in the header or footer band of several pages.
    pub fn remove_headers_footers(&self, pages: &[Page]) -> Vec<Page> {
        let bands: Vec<Option<Band>> = pages.iter().map(|p| self.band(p)).collect();

        let mut header_pages: HashMap<String, HashSet<usize>> = HashMap::new();
        let mut footer_pages: HashMap<String, HashSet<usize>> = HashMap::new();
        for (idx, (page, band)) in pages.iter().zip(&bands).enumerate() {
            let Some(band) = band else { continue };
            for block in &page.blocks {
                if band.is_header(block) {
                    header_pages.entry(block_signature(block)).or_default().insert(idx);
                }
                if band.is_footer(block) {
                    footer_pages.entry(block_signature(block)).or_default().insert(idx);
                }
            }
        }

        let min_pages = self.options.header_footer_min_pages;
        let repeated = |map: &HashMap<String, HashSet<usize>>, sig: &str| {
            map.get(sig).is_some_and(|p| p.len() >= min_pages)
        };

        pages
            .iter()
            .zip(&bands)
            .map(|(page, band)| {
                let Some(band) = band else { return page.clone() };
                let blocks = page
                    .blocks
                    .iter()
                    .filter(|block| {
                        let sig = block_signature(block);
                        let header = band.is_header(block) && repeated(&header_pages, &sig);
                        let footer = band.is_footer(block) && repeated(&footer_pages, &sig);
                        !(header || footer)
                    })
                    .cloned()
                    .collect();
                page.with_blocks(blocks)
            })
            .collect()
    }

    /// Drop blocks whose signature occurs too often anywhere in the document.
    pub fn drop_global_repeats(&self, pages: &[Page]) -> Vec<Page> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for block in pages.iter().flat_map(|p| p.blocks.iter()) {
            *counts.entry(block_signature(block)).or_insert(0) += 1;
        }

        let dropped = counts
            .values()
            .filter(|&&n| n >= self.options.global_min_occurrences)
            .count();
        if dropped > 0 {
            log::debug!("repetition filter: {} boilerplate signatures", dropped);
        }

        pages
            .iter()
            .map(|page| {
                let blocks = page
                    .blocks
                    .iter()
                    .filter(|b| counts[&block_signature(b)] < self.options.global_min_occurrences)
                    .cloned()
                    .collect();
                page.with_blocks(blocks)
            })
            .collect()
    }
}
