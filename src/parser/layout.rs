//! Layout reconstruction for PDF pages.
//!
//! Walks a page's content stream to recover positioned text spans, then
//! rebuilds lines, paragraphs and reading order from their geometry:
//!
//! 1. spans on a shared baseline become a line
//! 2. lines opening with a bullet or enumerator are tagged as list items
//! 3. consecutive lines in the same font with a small vertical gap become a paragraph
//! 4. a block ending with `:` absorbs the following block (label/value pairs)
//! 5. blocks are sorted top-to-bottom, left-to-right
//! 6. touching blocks sharing font and size are merged
//!
//! Coordinates are top-left origin with y growing downwards.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::model::{union_bbox, BBox, BlockType, PageBlock};
use crate::text::TextNormalizer;

use super::backend::{get_number_from_value, BackendFontInfo, PageId, PdfBackend, PdfValue};

/// Average glyph advance as a fraction of the font size.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Kerning (thousandths of an em) that reads as a word break inside TJ.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Bullet glyphs, or an enumerator such as `1.`, `12)`, `(3)`.
static LIST_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-•–—·*▪●◦■►]|\(?\d{1,3}[.)](?:\s|$)|\(\d{1,3}\))").unwrap()
});

/// A text span with position and style information.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position of the baseline (distance from the top of the page)
    pub y: f32,
    /// Estimated width of the text
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,
}

impl TextSpan {
    /// Create a new text span; width is estimated from the character count.
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32, font_name: impl Into<String>) -> Self {
        let text = text.into();
        let width = text.chars().count() as f32 * font_size * APPROX_CHAR_WIDTH_RATIO;
        Self {
            text,
            x,
            y,
            width,
            font_size,
            font_name: font_name.into(),
        }
    }

    /// Top edge (approximate ascender).
    pub fn top(&self) -> f32 {
        self.y - self.font_size * 0.8
    }

    /// Bottom edge (approximate descender).
    pub fn bottom(&self) -> f32 {
        self.y + self.font_size * 0.2
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bounding box `[x0, y0, x1, y1]`.
    pub fn bbox(&self) -> BBox {
        [self.x, self.top(), self.right(), self.bottom()]
    }
}

/// The spans of one text object (`BT` … `ET`), in content order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBlock {
    pub spans: Vec<TextSpan>,
}

/// Positioned text of a single page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSpans {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Raw blocks in content order
    pub blocks: Vec<RawBlock>,
}

impl PageSpans {
    /// All spans of the page, in content order.
    pub fn spans(&self) -> impl Iterator<Item = &TextSpan> {
        self.blocks.iter().flat_map(|b| b.spans.iter())
    }
}

// ---------------------------------------------------------------------------
// Content stream walk
// ---------------------------------------------------------------------------

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Text state tracked while walking a content stream.
#[derive(Debug, Clone)]
struct TextState {
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    leading: f32,
    font_key: Vec<u8>,
    font_name: String,
    font_size: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            leading: 0.0,
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 12.0,
        }
    }
}

impl TextState {
    fn set_matrix(&mut self, m: [f32; 6]) {
        self.text_matrix = m;
        self.line_matrix = m;
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        let m = self.line_matrix;
        self.line_matrix[4] = m[0] * tx + m[2] * ty + m[4];
        self.line_matrix[5] = m[1] * tx + m[3] * ty + m[5];
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.leading != 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.translate_line(0.0, -leading);
    }

    /// Advance along the baseline by `tx` text-space units.
    fn advance(&mut self, tx: f32) {
        let m = self.text_matrix;
        self.text_matrix[4] += tx * m[0];
        self.text_matrix[5] += tx * m[1];
    }

    fn effective_size(&self) -> f32 {
        let m = self.text_matrix;
        let scale = (m[2] * m[2] + m[3] * m[3]).sqrt();
        if scale > 0.0 {
            self.font_size * scale
        } else {
            self.font_size
        }
    }

    fn horizontal_scale(&self) -> f32 {
        let m = self.text_matrix;
        let scale = (m[0] * m[0] + m[1] * m[1]).sqrt();
        if scale > 0.0 {
            scale
        } else {
            1.0
        }
    }
}

/// Walk a page's content stream and collect its text spans, grouped per text object.
///
/// Span text is passed through `normalizer`; empty spans are dropped.
/// Consecutive show operations that continue on the same baseline in the
/// same font are coalesced into one span.
pub fn extract_page_spans(
    backend: &dyn PdfBackend,
    page_number: u32,
    page_id: PageId,
    normalizer: &TextNormalizer,
) -> Result<PageSpans> {
    let (width, height) = backend.page_size(page_id);
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    let fonts = backend.page_fonts(page_id).unwrap_or_default();

    let mut state = TextState::default();
    let mut blocks: Vec<RawBlock> = Vec::new();
    let mut current = RawBlock::default();

    for op in &ops {
        match op.operator.as_str() {
            "BT" => {
                state.set_matrix(IDENTITY);
                flush_block(&mut current, &mut blocks);
            }
            "ET" => flush_block(&mut current, &mut blocks),
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let PdfValue::Name(key) = &op.operands[0] {
                        state.font_name = resolve_font(key, &fonts)
                            .map(|f| f.base_font.clone())
                            .unwrap_or_else(|| String::from_utf8_lossy(key).to_string());
                        state.font_key = key.clone();
                    }
                    state.font_size = get_number_from_value(&op.operands[1]).unwrap_or(12.0);
                }
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let tx = get_number_from_value(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.translate_line(tx, ty);
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    let mut m = IDENTITY;
                    for (i, slot) in m.iter_mut().enumerate() {
                        if let Some(v) = get_number_from_value(&op.operands[i]) {
                            *slot = v;
                        }
                    }
                    state.set_matrix(m);
                }
            }
            "TL" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.leading = v;
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    let text = backend.decode_text(page_id, &state.font_key, bytes);
                    show_text(&mut state, &text, height, normalizer, &mut current);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    show_text_array(&mut state, items, backend, page_id, height, normalizer, &mut current);
                }
            }
            "'" | "\"" => {
                state.next_line();
                let idx = if op.operator == "\"" { 2 } else { 0 };
                if let Some(PdfValue::Str(bytes)) = op.operands.get(idx) {
                    let text = backend.decode_text(page_id, &state.font_key, bytes);
                    show_text(&mut state, &text, height, normalizer, &mut current);
                }
            }
            _ => {}
        }
    }
    flush_block(&mut current, &mut blocks);

    log::debug!(
        "page {}: {} raw blocks, {} spans",
        page_number,
        blocks.len(),
        blocks.iter().map(|b| b.spans.len()).sum::<usize>()
    );

    Ok(PageSpans {
        page_number,
        width,
        height,
        blocks,
    })
}

fn flush_block(current: &mut RawBlock, blocks: &mut Vec<RawBlock>) {
    if !current.spans.is_empty() {
        blocks.push(std::mem::take(current));
    }
}

fn resolve_font<'a>(key: &[u8], fonts: &'a [BackendFontInfo]) -> Option<&'a BackendFontInfo> {
    fonts.iter().find(|info| info.name == key)
}

/// Emit `text` at the current position and advance past it.
fn show_text(
    state: &mut TextState,
    text: &str,
    page_height: f32,
    normalizer: &TextNormalizer,
    block: &mut RawBlock,
) {
    let advance = text.chars().count() as f32 * state.font_size * APPROX_CHAR_WIDTH_RATIO;
    let cleaned = normalizer.normalize_str(text);
    if !cleaned.trim().is_empty() {
        let size = state.effective_size();
        let x = state.text_matrix[4];
        let y = page_height - state.text_matrix[5];
        let mut span = TextSpan::new(cleaned, x, y, size, state.font_name.clone());
        span.width = advance * state.horizontal_scale();
        push_span(block, span);
    }
    state.advance(advance);
}

fn show_text_array(
    state: &mut TextState,
    items: &[PdfValue],
    backend: &dyn PdfBackend,
    page_id: PageId,
    page_height: f32,
    normalizer: &TextNormalizer,
    block: &mut RawBlock,
) {
    let mut combined = String::new();
    let start_x = state.text_matrix[4];
    let start_y = state.text_matrix[5];
    let mut advance = 0.0;

    for item in items {
        match item {
            PdfValue::Str(bytes) => {
                let decoded = backend.decode_text(page_id, &state.font_key, bytes);
                advance += decoded.chars().count() as f32 * state.font_size * APPROX_CHAR_WIDTH_RATIO;
                combined.push_str(&decoded);
            }
            PdfValue::Integer(_) | PdfValue::Real(_) => {
                let adjustment = -get_number_from_value(item).unwrap_or(0.0);
                advance += adjustment / 1000.0 * state.font_size;
                if adjustment > TJ_SPACE_THRESHOLD
                    && !combined.is_empty()
                    && !combined.ends_with(' ')
                    && !combined.chars().last().is_some_and(is_spaceless_script_char)
                {
                    combined.push(' ');
                }
            }
            _ => {}
        }
    }

    let cleaned = normalizer.normalize_str(&combined);
    if !cleaned.trim().is_empty() {
        let size = state.effective_size();
        let mut span = TextSpan::new(cleaned, start_x, page_height - start_y, size, state.font_name.clone());
        span.width = advance.max(0.0) * state.horizontal_scale();
        push_span(block, span);
    }
    state.advance(advance);
}

/// Append a span, coalescing it with the previous one when it continues the same run.
fn push_span(block: &mut RawBlock, span: TextSpan) {
    if let Some(last) = block.spans.last_mut() {
        let same_run = last.font_name == span.font_name
            && (last.font_size - span.font_size).abs() < 0.01
            && (last.y - span.y).abs() < 0.5;
        let gap = span.x - last.right();
        if same_run && gap > -0.5 * span.font_size && gap < 0.25 * span.font_size {
            let needs_space = gap > 0.1 * span.font_size
                && !last.text.ends_with(' ')
                && !span.text.starts_with(' ');
            if needs_space {
                last.text.push(' ');
            }
            last.text.push_str(&span.text);
            last.width = span.right() - last.x;
            return;
        }
    }
    block.spans.push(span);
}

/// Check if character is from a script that doesn't use word spaces.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;
    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x3040..=0x309F).contains(&code)
        || (0x30A0..=0x30FF).contains(&code)
        || (0x3000..=0x303F).contains(&code)
}

// ---------------------------------------------------------------------------
// Block reconstruction
// ---------------------------------------------------------------------------

/// Tuning for block reconstruction.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Max gap between lines of one paragraph, as a multiple of the font size
    pub line_gap_multiplier: f32,
    /// Max gap between merged adjacent blocks, as a multiple of the font size
    pub gap_multiplier: f32,
    /// Baseline tolerance for spans of one line, as a fraction of the font size
    pub line_tolerance: f32,
    /// Font size assumed when a block carries none
    pub default_font_size: f32,
}

impl LayoutOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the paragraph line-gap multiplier.
    pub fn with_line_gap_multiplier(mut self, multiplier: f32) -> Self {
        self.line_gap_multiplier = multiplier;
        self
    }

    /// Set the adjacent-block gap multiplier.
    pub fn with_gap_multiplier(mut self, multiplier: f32) -> Self {
        self.gap_multiplier = multiplier;
        self
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            line_gap_multiplier: 0.8,
            gap_multiplier: 0.5,
            line_tolerance: 0.3,
            default_font_size: 10.0,
        }
    }
}

/// Turns raw span blocks into reading-ordered page blocks.
#[derive(Debug, Clone, Default)]
pub struct LayoutAnalyzer {
    options: LayoutOptions,
}

impl LayoutAnalyzer {
    /// Create an analyzer.
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Run the full reconstruction on a page's raw blocks.
    ///
    /// Lines are joined into paragraphs only within their own text object;
    /// blocks from different objects meet again in the adjacent-block pass.
    pub fn analyze(&self, raw_blocks: &[RawBlock]) -> Vec<PageBlock> {
        let paragraphs: Vec<PageBlock> = raw_blocks
            .iter()
            .flat_map(|raw| {
                let lines = self.merge_spans_into_lines(std::slice::from_ref(raw));
                self.merge_lines_into_paragraphs(tag_list_items(lines))
            })
            .collect();
        let labelled = merge_label_value_blocks(paragraphs);
        let ordered = sort_reading_order(labelled);
        self.merge_adjacent_blocks(ordered)
    }

    /// Group each raw block's spans into lines by baseline.
    pub fn merge_spans_into_lines(&self, raw_blocks: &[RawBlock]) -> Vec<PageBlock> {
        let mut lines = Vec::new();
        for raw in raw_blocks {
            let mut current: Vec<&TextSpan> = Vec::new();
            let mut baseline: Option<f32> = None;

            for span in &raw.spans {
                if span.text.trim().is_empty() {
                    continue;
                }
                let tolerance = span.font_size * self.options.line_tolerance;
                match baseline {
                    Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
                    _ => {
                        if let Some(line) = line_from_spans(&current) {
                            lines.push(line);
                        }
                        current = vec![span];
                        baseline = Some(span.y);
                    }
                }
            }
            if let Some(line) = line_from_spans(&current) {
                lines.push(line);
            }
        }
        lines
    }

    /// Merge consecutive lines sharing a font whose vertical gap is small.
    pub fn merge_lines_into_paragraphs(&self, lines: Vec<PageBlock>) -> Vec<PageBlock> {
        let mut paragraphs = Vec::new();
        let mut group: Vec<PageBlock> = Vec::new();

        for line in lines {
            let joins = match group.last() {
                Some(prev) => {
                    let size = prev
                        .font_size
                        .or(line.font_size)
                        .unwrap_or(self.options.default_font_size);
                    prev.font_name == line.font_name
                        && vertical_gap(prev, &line)
                            .is_some_and(|gap| gap >= 0.0 && gap <= size * self.options.line_gap_multiplier)
                }
                None => false,
            };
            if !joins {
                if let Some(paragraph) = paragraph_from_lines(std::mem::take(&mut group)) {
                    paragraphs.push(paragraph);
                }
            }
            group.push(line);
        }
        if let Some(paragraph) = paragraph_from_lines(group) {
            paragraphs.push(paragraph);
        }
        paragraphs
    }

    /// Merge reading-ordered neighbours that share font and size and nearly touch.
    pub fn merge_adjacent_blocks(&self, blocks: Vec<PageBlock>) -> Vec<PageBlock> {
        let mut merged: Vec<PageBlock> = Vec::with_capacity(blocks.len());
        for block in blocks {
            if let Some(prev) = merged.last_mut() {
                let same_style = prev.font_name == block.font_name
                    && match (prev.font_size, block.font_size) {
                        (Some(a), Some(b)) => (a - b).abs() < 0.01,
                        (None, None) => true,
                        _ => false,
                    };
                if same_style {
                    let size = prev.font_size.unwrap_or(self.options.default_font_size);
                    let close = vertical_gap(prev, &block)
                        .is_some_and(|gap| gap >= 0.0 && gap <= size * self.options.gap_multiplier);
                    if close {
                        let combined = PageBlock {
                            text: join_text(&prev.text, &block.text),
                            bbox: union_bbox(prev.bbox, block.bbox),
                            ..prev.clone()
                        };
                        *prev = combined;
                        continue;
                    }
                }
            }
            merged.push(block);
        }
        merged
    }
}

/// Gap between the bottom of `upper` and the top of `lower`.
fn vertical_gap(upper: &PageBlock, lower: &PageBlock) -> Option<f32> {
    Some(lower.top()? - upper.bottom()?)
}

fn join_text(a: &str, b: &str) -> String {
    let a = a.trim_end();
    let b = b.trim_start();
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{} {}", a, b),
    }
}

/// Most frequent value; ties go to the first seen.
fn mode<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, value) in values.enumerate() {
        let entry = counts.entry(value).or_insert((0, idx));
        entry.0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (ca, ia)), (_, (cb, ib))| ca.cmp(cb).then(ib.cmp(ia)))
        .map(|(v, _)| v.to_string())
}

fn line_from_spans(spans: &[&TextSpan]) -> Option<PageBlock> {
    let text = spans
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return None;
    }

    let size = spans.iter().map(|s| s.font_size).sum::<f32>() / spans.len() as f32;
    let font = mode(spans.iter().map(|s| s.font_name.as_str())).unwrap_or_default();
    let bbox = spans
        .iter()
        .fold(None, |acc, s| union_bbox(acc, Some(s.bbox())));

    Some(PageBlock {
        text,
        bbox,
        ..PageBlock::default()
    }
    .with_font(font, size))
}

fn paragraph_from_lines(lines: Vec<PageBlock>) -> Option<PageBlock> {
    let first = lines.first()?.clone();
    if lines.len() == 1 {
        return Some(first);
    }

    let sizes: Vec<f32> = lines.iter().filter_map(|l| l.font_size).collect();
    let font_size = if sizes.is_empty() {
        None
    } else {
        Some(sizes.iter().sum::<f32>() / sizes.len() as f32)
    };
    let font_name = mode(lines.iter().filter_map(|l| l.font_name.as_deref()));
    let bbox = lines.iter().fold(None, |acc, l| union_bbox(acc, l.bbox));
    let text = lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Some(PageBlock {
        text,
        bbox,
        font_size,
        font_name,
        ..first
    })
}

/// Check whether text opens with a bullet or enumerator.
pub fn is_list_item_text(text: &str) -> bool {
    LIST_PREFIX.is_match(text.trim_start())
}

/// Retype lines that open with a bullet or enumerator as list items.
pub fn tag_list_items(lines: Vec<PageBlock>) -> Vec<PageBlock> {
    lines
        .into_iter()
        .map(|line| {
            if is_list_item_text(&line.text) {
                line.with_type(BlockType::ListItem)
            } else {
                line
            }
        })
        .collect()
}

/// Merge a block ending with `:` with the block that follows it.
pub fn merge_label_value_blocks(blocks: Vec<PageBlock>) -> Vec<PageBlock> {
    let mut result = Vec::with_capacity(blocks.len());
    let mut iter = blocks.into_iter().peekable();

    while let Some(block) = iter.next() {
        if block.text.trim_end().ends_with(':') {
            if let Some(value) = iter.next() {
                let font_name = block.font_name.clone().or_else(|| value.font_name.clone());
                let font_size = block.font_size.or(value.font_size);
                result.push(PageBlock {
                    text: join_text(&block.text, &value.text),
                    bbox: union_bbox(block.bbox, value.bbox),
                    font_name,
                    font_size,
                    ..block
                });
                continue;
            }
        }
        result.push(block);
    }
    result
}

/// Stable sort by top edge, then left edge; blocks without a box sort first.
pub fn sort_reading_order(mut blocks: Vec<PageBlock>) -> Vec<PageBlock> {
    blocks.sort_by(|a, b| {
        let (ax, ay) = a.bbox.map(|b| (b[0], b[1])).unwrap_or((0.0, 0.0));
        let (bx, by) = b.bbox.map(|b| (b[0], b[1])).unwrap_or((0.0, 0.0));
        ay.partial_cmp(&by)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal))
    });
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, y: f32, size: f32, font: &str) -> TextSpan {
        TextSpan::new(text, x, y, size, font)
    }

    fn line(text: &str, y0: f32, y1: f32, font: &str, size: f32) -> PageBlock {
        PageBlock::new(text)
            .with_bbox([72.0, y0, 300.0, y1])
            .with_font(font, size)
    }

    // ==================== Span / Line Tests ====================

    #[test]
    fn test_span_geometry() {
        let s = span("Lotto", 100.0, 200.0, 10.0, "Helvetica");
        assert_eq!(s.width, 25.0);
        assert_eq!(s.bbox(), [100.0, 192.0, 125.0, 202.0]);
    }

    #[test]
    fn test_merge_spans_into_lines() {
        let analyzer = LayoutAnalyzer::default();
        let raw = vec![RawBlock {
            spans: vec![
                span("Importo", 72.0, 100.0, 10.0, "Helvetica"),
                span("a base", 120.0, 100.5, 12.0, "Helvetica-Bold"),
                span("d'asta", 170.0, 100.0, 10.0, "Helvetica-Bold"),
                span("Seconda riga", 72.0, 115.0, 10.0, "Helvetica"),
            ],
        }];

        let lines = analyzer.merge_spans_into_lines(&raw);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Importo a base d'asta");
        assert_eq!(lines[0].font_name.as_deref(), Some("Helvetica-Bold"));
        let size = lines[0].font_size.unwrap();
        assert!((size - 32.0 / 3.0).abs() < 1e-4);
        let bbox = lines[0].bbox.unwrap();
        assert_eq!(bbox[0], 72.0);
        assert_eq!(lines[1].text, "Seconda riga");
    }

    #[test]
    fn test_mode_tie_prefers_first() {
        let fonts = ["A", "B", "B", "A"];
        assert_eq!(mode(fonts.iter().copied()).as_deref(), Some("A"));
    }

    #[test]
    fn test_push_span_coalesces_continuations() {
        let mut block = RawBlock::default();
        push_span(&mut block, span("Ban", 72.0, 100.0, 10.0, "F"));
        push_span(&mut block, span("do", 87.0, 100.0, 10.0, "F"));
        push_span(&mut block, span("gara", 200.0, 100.0, 10.0, "F"));
        assert_eq!(block.spans.len(), 2);
        assert_eq!(block.spans[0].text, "Bando");
        assert_eq!(block.spans[0].width, 25.0);
    }

    // ==================== List Tagging ====================

    #[test]
    fn test_list_item_detection() {
        assert!(is_list_item_text("- requisiti generali"));
        assert!(is_list_item_text("• requisiti"));
        assert!(is_list_item_text("1. Premessa"));
        assert!(is_list_item_text("12) offerta tecnica"));
        assert!(is_list_item_text("(3) garanzia"));
        assert!(!is_list_item_text("1.2 Oggetto"));
        assert!(!is_list_item_text("3.000 euro"));
        assert!(!is_list_item_text("Art. 5"));
    }

    // ==================== Paragraph Merge ====================

    #[test]
    fn test_merge_lines_into_paragraphs() {
        let analyzer = LayoutAnalyzer::default();
        let lines = vec![
            line("Il presente disciplinare", 100.0, 110.0, "Times", 10.0),
            line("contiene le norme", 112.0, 122.0, "Times", 10.0),
            // gap 20 > 8: new paragraph
            line("Secondo paragrafo", 142.0, 152.0, "Times", 10.0),
            // same gap but different font
            line("Titolo", 154.0, 164.0, "Times-Bold", 10.0),
        ];

        let paragraphs = analyzer.merge_lines_into_paragraphs(lines);
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0].text, "Il presente disciplinare contiene le norme");
        assert_eq!(paragraphs[0].bbox, Some([72.0, 100.0, 300.0, 122.0]));
        assert_eq!(paragraphs[1].text, "Secondo paragrafo");
        assert_eq!(paragraphs[2].text, "Titolo");
    }

    #[test]
    fn test_paragraph_keeps_first_line_type() {
        let analyzer = LayoutAnalyzer::default();
        let lines = tag_list_items(vec![
            line("- primo requisito", 100.0, 110.0, "Times", 10.0),
            line("che continua qui", 111.0, 121.0, "Times", 10.0),
        ]);
        let paragraphs = analyzer.merge_lines_into_paragraphs(lines);
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].block_type, BlockType::ListItem);
    }

    #[test]
    fn test_overlapping_lines_not_merged() {
        let analyzer = LayoutAnalyzer::default();
        let lines = vec![
            line("upper", 100.0, 110.0, "Times", 10.0),
            line("overlapping", 105.0, 115.0, "Times", 10.0),
        ];
        assert_eq!(analyzer.merge_lines_into_paragraphs(lines).len(), 2);
    }

    // ==================== Label / Value ====================

    #[test]
    fn test_merge_label_value_blocks() {
        let blocks = vec![
            line("Email:", 100.0, 110.0, "Helvetica-Bold", 10.0),
            line("foo@bar.com", 100.0, 110.0, "Helvetica", 10.0),
            line("Altro", 130.0, 140.0, "Helvetica", 10.0),
        ];
        let merged = merge_label_value_blocks(blocks);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "Email: foo@bar.com");
        assert_eq!(merged[0].font_name.as_deref(), Some("Helvetica-Bold"));
        assert_eq!(merged[1].text, "Altro");
    }

    #[test]
    fn test_trailing_label_is_kept() {
        let blocks = vec![PageBlock::new("Note:")];
        let merged = merge_label_value_blocks(blocks);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Note:");
    }

    // ==================== Reading Order / Adjacent Merge ====================

    #[test]
    fn test_sort_reading_order_is_stable() {
        let blocks = vec![
            PageBlock::new("right").with_bbox([300.0, 100.0, 400.0, 110.0]),
            PageBlock::new("below").with_bbox([72.0, 200.0, 100.0, 210.0]),
            PageBlock::new("left").with_bbox([72.0, 100.0, 100.0, 110.0]),
            PageBlock::new("tie-a").with_bbox([72.0, 300.0, 100.0, 310.0]),
            PageBlock::new("tie-b").with_bbox([72.0, 300.0, 100.0, 310.0]),
            PageBlock::new("nobox"),
        ];
        let texts: Vec<String> = sort_reading_order(blocks)
            .into_iter()
            .map(|b| b.text)
            .collect();
        assert_eq!(texts, vec!["nobox", "left", "right", "below", "tie-a", "tie-b"]);
    }

    #[test]
    fn test_merge_adjacent_blocks() {
        let analyzer = LayoutAnalyzer::default();
        let blocks = vec![
            line("prima parte", 100.0, 110.0, "Times", 10.0),
            line("seconda parte", 114.0, 124.0, "Times", 10.0),
            line("lontano", 200.0, 210.0, "Times", 10.0),
            line("altro font", 212.0, 222.0, "Arial", 10.0),
        ];
        let merged = analyzer.merge_adjacent_blocks(blocks);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].text, "prima parte seconda parte");
        assert_eq!(merged[0].bbox, Some([72.0, 100.0, 300.0, 124.0]));
    }

    #[test]
    fn test_merge_adjacent_blocks_without_font() {
        let analyzer = LayoutAnalyzer::default();
        let blocks = vec![
            PageBlock::new("senza").with_bbox([72.0, 100.0, 300.0, 110.0]),
            PageBlock::new("font").with_bbox([72.0, 113.0, 300.0, 123.0]),
            PageBlock::new("con font").with_bbox([72.0, 125.0, 300.0, 135.0]).with_font("Times", 10.0),
        ];
        let merged = analyzer.merge_adjacent_blocks(blocks);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "senza font");
        assert_eq!(merged[0].bbox, Some([72.0, 100.0, 300.0, 123.0]));
    }

    #[test]
    fn test_analyze_keeps_text_objects_apart() {
        // 6pt gap: within the line-gap limit (8) but past the adjacent-block limit (5)
        let raw = vec![
            RawBlock { spans: vec![span("Primo blocco", 72.0, 100.0, 10.0, "Times")] },
            RawBlock { spans: vec![span("Secondo blocco", 72.0, 116.0, 10.0, "Times")] },
        ];
        let blocks = LayoutAnalyzer::default().analyze(&raw);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "Primo blocco");
        assert_eq!(blocks[1].text, "Secondo blocco");

        let joined = vec![RawBlock {
            spans: raw.into_iter().flat_map(|r| r.spans).collect(),
        }];
        let blocks = LayoutAnalyzer::default().analyze(&joined);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Primo blocco Secondo blocco");
    }

    #[test]
    fn test_analyze_empty() {
        assert!(LayoutAnalyzer::default().analyze(&[]).is_empty());
    }
}
