//! Table detection.
//!
//! Two complementary detectors:
//!
//! - a position-based ("stream mode") detector that finds tables from the
//!   alignment of glyph spans, without relying on ruling lines
//! - a text heuristic that flags blocks whose text is laid out in columns
//!   (tabs, pipes, or runs of spaces)

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{BlockType, PageBlock};

use super::layout::{RawBlock, TextSpan};

/// Runs of two or more whitespace characters (column gaps in plain text).
static COLUMN_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Bucket width used to group span left edges into column candidates.
const EDGE_BUCKET: f32 = 5.0;

/// A detected table region with its content.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Top edge of the first row
    pub top_y: f32,
    /// Bottom edge of the last row
    pub bottom_y: f32,
    /// Left X boundary
    pub left_x: f32,
    /// Right X boundary
    pub right_x: f32,
    /// Detected column boundaries (X coordinates)
    pub columns: Vec<f32>,
    /// Rows of text spans, top to bottom
    pub rows: Vec<TableRowData>,
}

impl DetectedTable {
    /// Cell grid: one entry per row, one string per column.
    pub fn cells(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut cells: Vec<Vec<&str>> = vec![Vec::new(); self.columns.len()];
                for span in &row.spans {
                    let col = find_column_for_span(span.x, &self.columns, self.right_x);
                    if let Some(cell) = cells.get_mut(col) {
                        cell.push(span.text.trim());
                    }
                }
                cells.into_iter().map(|parts| parts.join(" ")).collect()
            })
            .collect()
    }

    /// Convert to a `table_block` page block.
    pub fn to_block(&self) -> PageBlock {
        PageBlock::table(self.cells()).with_bbox([self.left_x, self.top_y, self.right_x, self.bottom_y])
    }
}

/// A row of text spans in a table.
#[derive(Debug, Clone)]
pub struct TableRowData {
    /// Mean baseline of the row
    pub y: f32,
    /// Spans in this row, sorted by X
    pub spans: Vec<TextSpan>,
}

/// Table detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping spans into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
        }
    }
}

/// Detects tables from span alignment.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect tables among a page's raw blocks.
    ///
    /// Returns the tables and the raw blocks with table spans removed
    /// (blocks left empty are dropped).
    pub fn detect_in_blocks(&self, blocks: Vec<RawBlock>) -> (Vec<DetectedTable>, Vec<RawBlock>) {
        let spans: Vec<TextSpan> = blocks.iter().flat_map(|b| b.spans.iter().cloned()).collect();
        let (tables, used) = self.detect(&spans);
        if tables.is_empty() {
            return (tables, blocks);
        }

        let mut index = 0;
        let remaining = blocks
            .into_iter()
            .filter_map(|block| {
                let kept: Vec<TextSpan> = block
                    .spans
                    .into_iter()
                    .filter(|_| {
                        let keep = !used.contains(&index);
                        index += 1;
                        keep
                    })
                    .collect();
                (!kept.is_empty()).then_some(RawBlock { spans: kept })
            })
            .collect();
        (tables, remaining)
    }

    /// Detect tables in the given spans.
    ///
    /// Returns detected tables and the indices of the spans they consumed.
    pub fn detect(&self, spans: &[TextSpan]) -> (Vec<DetectedTable>, HashSet<usize>) {
        let mut used = HashSet::new();
        if spans.len() < self.config.min_rows * self.config.min_columns {
            return (vec![], used);
        }

        let rows = self.group_into_rows(spans);
        if rows.len() < self.config.min_rows {
            return (vec![], used);
        }

        let columns = self.detect_columns(&rows);
        if columns.len() < self.config.min_columns {
            return (vec![], used);
        }

        let regions = self.find_table_regions(&rows, &columns);
        log::debug!(
            "TableDetector: {} rows, {} columns, {} candidate regions",
            rows.len(),
            columns.len(),
            regions.len()
        );

        let mut tables = Vec::new();
        for (start_row, end_row) in regions {
            let table_rows: Vec<TableRowData> = rows[start_row..=end_row].to_vec();
            let table_columns = self.detect_columns(&table_rows);

            if table_columns.len() < self.config.min_columns {
                continue;
            }
            if table_columns.len() > self.config.max_columns {
                log::debug!(
                    "TableDetector: skipping region, too many columns ({} > {})",
                    table_columns.len(),
                    self.config.max_columns
                );
                continue;
            }
            if self.is_list_pattern(&table_rows, &table_columns) {
                log::debug!("TableDetector: skipping region, detected as list pattern");
                continue;
            }

            let region_spans = || table_rows.iter().flat_map(|r| r.spans.iter());
            let top_y = region_spans().map(|s| s.top()).fold(f32::INFINITY, f32::min);
            let bottom_y = region_spans().map(|s| s.bottom()).fold(f32::NEG_INFINITY, f32::max);
            let left_x = region_spans().map(|s| s.x).fold(f32::INFINITY, f32::min);
            let right_x = region_spans().map(|s| s.right()).fold(f32::NEG_INFINITY, f32::max);

            for span in region_spans() {
                for (i, orig) in spans.iter().enumerate() {
                    if (orig.x - span.x).abs() < 0.1
                        && (orig.y - span.y).abs() < 0.1
                        && orig.text == span.text
                    {
                        used.insert(i);
                    }
                }
            }

            tables.push(DetectedTable {
                top_y,
                bottom_y,
                left_x,
                right_x,
                columns: table_columns,
                rows: table_rows,
            });
        }

        (tables, used)
    }

    /// Group spans into rows by baseline, top to bottom.
    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<TableRowData> {
        let mut sorted = spans.to_vec();
        sorted.sort_by(|a, b| {
            a.y.partial_cmp(&b.y)
                .unwrap_or(Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
        });

        let mut rows: Vec<TableRowData> = Vec::new();
        let mut current: Vec<TextSpan> = Vec::new();
        let mut current_y: Option<f32> = None;

        for span in sorted {
            let tolerance = span.font_size * self.config.y_tolerance_factor;
            match current_y {
                Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
                _ => {
                    if let Some(row) = finish_row(std::mem::take(&mut current)) {
                        rows.push(row);
                    }
                    current_y = Some(span.y);
                    current.push(span);
                }
            }
        }
        if let Some(row) = finish_row(current) {
            rows.push(row);
        }
        rows
    }

    /// Column boundaries from left edges aligned across rows.
    fn detect_columns(&self, rows: &[TableRowData]) -> Vec<f32> {
        let multi_span_rows: Vec<&TableRowData> = rows.iter().filter(|r| r.spans.len() >= 2).collect();

        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        let considered = if multi_span_rows.len() < self.config.min_rows {
            // few multi-span rows: count every span edge
            for row in rows {
                for span in &row.spans {
                    *edge_counts.entry(edge_bucket(span.x)).or_insert(0) += 1;
                }
            }
            rows.len()
        } else {
            for row in &multi_span_rows {
                let buckets: HashSet<i32> = row.spans.iter().map(|s| edge_bucket(s.x)).collect();
                for bucket in buckets {
                    *edge_counts.entry(bucket).or_insert(0) += 1;
                }
            }
            multi_span_rows.len()
        };

        let min_occurrences = ((considered as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f32> = edge_counts
            .iter()
            .filter(|(_, count)| **count >= min_occurrences)
            .map(|(bucket, _)| *bucket as f32 * EDGE_BUCKET)
            .collect();
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Contiguous runs of aligned rows.
    fn find_table_regions(&self, rows: &[TableRowData], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let aligned = aligned_spans(row, columns);
            let is_table_row = aligned >= self.config.min_columns
                && aligned as f32 / row.spans.len() as f32 >= self.config.min_alignment_ratio;
            if is_table_row {
                start.get_or_insert(i);
            } else if let Some(s) = start.take() {
                if i - s >= self.config.min_rows {
                    regions.push((s, i - 1));
                }
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }
        regions
    }

    /// Numbered or bulleted lists split into marker and text spans look like
    /// two-column tables.
    fn is_list_pattern(&self, rows: &[TableRowData], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullets = 0;
        let mut numbers = 0;
        for row in rows {
            if let Some(first) = row.spans.first() {
                let text = first.text.trim();
                if is_bullet_marker(text) {
                    bullets += 1;
                } else if is_number_marker(text) {
                    numbers += 1;
                }
            }
        }

        let bullet_ratio = bullets as f32 / rows.len() as f32;
        let total_ratio = (bullets + numbers) as f32 / rows.len() as f32;
        bullet_ratio >= 0.5 || (columns.len() == 2 && total_ratio >= 0.5)
    }
}

fn edge_bucket(x: f32) -> i32 {
    (x / EDGE_BUCKET).round() as i32
}

fn finish_row(mut spans: Vec<TextSpan>) -> Option<TableRowData> {
    if spans.is_empty() {
        return None;
    }
    spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
    let y = spans.iter().map(|s| s.y).sum::<f32>() / spans.len() as f32;
    Some(TableRowData { y, spans })
}

/// Number of a row's spans starting on a column edge.
fn aligned_spans(row: &TableRowData, columns: &[f32]) -> usize {
    row.spans
        .iter()
        .filter(|span| columns.iter().any(|col| (span.x - col).abs() <= EDGE_BUCKET))
        .count()
}

/// Column index for a span starting at `span_x`.
fn find_column_for_span(span_x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &col_start) in columns.iter().enumerate() {
        let col_end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        // 10pt slack for spans starting slightly before their column
        if span_x >= col_start - 10.0 && span_x < col_end - 10.0 {
            return i;
        }
    }

    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (span_x - **a)
                .abs()
                .partial_cmp(&(span_x - **b).abs())
                .unwrap_or(Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "▶" | "➤"
    )
}

/// `1.`, `12)`, a bare number, or a letter marker such as `a.` / `B)`.
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }
    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}

// ---------------------------------------------------------------------------
// Text heuristic
// ---------------------------------------------------------------------------

/// Check whether plain text looks tabular.
///
/// At least two non-empty lines, and either a tab or pipe separator, or
/// space-aligned columns: some line splits into two or more segments on runs
/// of whitespace and the mean segment count exceeds 1.5.
pub fn is_table_like_text(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return false;
    }
    if text.contains('|') || text.contains('\t') {
        return true;
    }

    let counts: Vec<usize> = lines
        .iter()
        .map(|line| COLUMN_GAP.split(line).filter(|seg| !seg.is_empty()).count())
        .collect();
    let mean = counts.iter().sum::<usize>() as f32 / counts.len() as f32;
    counts.iter().any(|&c| c >= 2) && mean > 1.5
}

/// Retype table-like blocks as `table_block`; other blocks are returned as is.
pub fn flag_table_like_blocks(blocks: &[PageBlock]) -> Vec<PageBlock> {
    blocks
        .iter()
        .map(|block| {
            if !block.is_table() && is_table_like_text(block.text.trim()) {
                block.clone().with_type(BlockType::TableBlock).without_level()
            } else {
                block.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text, x, y, 12.0, "Helvetica")
    }

    // ==================== Stream Detection ====================

    #[test]
    fn test_group_into_rows() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("A2", 10.0, 115.0),
            make_span("B1", 60.0, 100.0),
            make_span("A1", 10.0, 100.0),
            make_span("B2", 60.0, 115.0),
        ];

        let rows = detector.group_into_rows(&spans);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].spans[0].text, "A1");
        assert_eq!(rows[0].spans[1].text, "B1");
        assert_eq!(rows[1].spans[0].text, "A2");
    }

    #[test]
    fn test_detect_columns() {
        let detector = TableDetector::new();
        let rows: Vec<TableRowData> = [100.0, 115.0, 130.0]
            .iter()
            .map(|&y| TableRowData {
                y,
                spans: vec![make_span("A", 10.0, y), make_span("B", 60.0, y)],
            })
            .collect();

        assert_eq!(detector.detect_columns(&rows), vec![10.0, 60.0]);
    }

    #[test]
    fn test_detect_simple_table() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("Lotto", 72.0, 100.0),
            make_span("Importo", 200.0, 100.0),
            make_span("Lotto A", 72.0, 115.0),
            make_span("1.000,00", 200.0, 115.0),
            make_span("Lotto B", 72.0, 130.0),
            make_span("2.500,00", 200.0, 130.0),
        ];

        let (tables, used) = detector.detect(&spans);
        assert_eq!(tables.len(), 1);
        assert_eq!(used.len(), 6);

        let table = &tables[0];
        assert_eq!(table.rows.len(), 3);
        assert_eq!(
            table.cells(),
            vec![
                vec!["Lotto".to_string(), "Importo".to_string()],
                vec!["Lotto A".to_string(), "1.000,00".to_string()],
                vec!["Lotto B".to_string(), "2.500,00".to_string()],
            ]
        );

        let block = table.to_block();
        assert_eq!(block.block_type, BlockType::TableBlock);
        assert_eq!(block.text, "Lotto | Importo\nLotto A | 1.000,00\nLotto B | 2.500,00");
        let bbox = block.bbox.unwrap();
        assert!(bbox[1] < 100.0 && bbox[3] > 130.0);
    }

    #[test]
    fn test_detect_in_blocks_removes_table_spans() {
        let detector = TableDetector::new();
        let blocks = vec![
            RawBlock {
                spans: vec![make_span("Premessa", 72.0, 60.0)],
            },
            RawBlock {
                spans: vec![
                    make_span("Voce", 72.0, 100.0),
                    make_span("Costo", 250.0, 100.0),
                    make_span("Canone", 72.0, 115.0),
                    make_span("100", 250.0, 115.0),
                ],
            },
        ];

        let (tables, remaining) = detector.detect_in_blocks(blocks);
        assert_eq!(tables.len(), 1);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].spans[0].text, "Premessa");
    }

    #[test]
    fn test_no_table_single_column() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("Line 1", 10.0, 100.0),
            make_span("Line 2", 10.0, 115.0),
            make_span("Line 3", 10.0, 130.0),
        ];

        let (tables, used) = detector.detect(&spans);
        assert!(tables.is_empty());
        assert!(used.is_empty());
    }

    #[test]
    fn test_numbered_list_not_detected_as_table() {
        let detector = TableDetector::new();
        let mut spans = Vec::new();
        for (i, item) in ["Premessa", "Oggetto", "Durata", "Importo", "Requisiti"].iter().enumerate() {
            let y = 100.0 + i as f32 * 30.0;
            spans.push(make_span(&format!("{}.", i + 1), 50.0, y));
            spans.push(make_span(item, 80.0, y));
        }

        let (tables, _) = detector.detect(&spans);
        assert!(tables.is_empty(), "numbered list should not be a table");
    }

    #[test]
    fn test_bullet_list_not_detected_as_table() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("-", 50.0, 100.0),
            make_span("Gestione", 80.0, 100.0),
            make_span("-", 50.0, 130.0),
            make_span("Manutenzione ordinaria", 80.0, 130.0),
            make_span("-", 50.0, 160.0),
            make_span("Reperibilità", 80.0, 160.0),
        ];

        let (tables, _) = detector.detect(&spans);
        assert!(tables.is_empty(), "bullet list should not be a table");
    }

    #[test]
    fn test_list_markers() {
        assert!(is_number_marker("1."));
        assert!(is_number_marker("12)"));
        assert!(is_number_marker("1 ."));
        assert!(is_number_marker("3"));
        assert!(is_number_marker("a."));
        assert!(is_bullet_marker("•"));
        assert!(is_bullet_marker("-"));
        assert!(!is_number_marker("Nome"));
        assert!(!is_number_marker(""));
        assert!(!is_bullet_marker("Alice"));
    }

    // ==================== Text Heuristic ====================

    #[test]
    fn test_table_like_text_separators() {
        assert!(is_table_like_text("Lotto | Importo\n1 | 1000"));
        assert!(is_table_like_text("Lotto\tImporto\n1\t1000"));
        // a single line is never a table
        assert!(!is_table_like_text("Lotto | Importo"));
    }

    #[test]
    fn test_table_like_text_spacing() {
        assert!(is_table_like_text("Lotto    Importo\n1        1000\n2        2500"));
        assert!(!is_table_like_text("Prima riga di testo\nSeconda riga di testo"));
        // mean segments 4/3 is not above 1.5
        assert!(!is_table_like_text("Voce    Costo\nuna riga\naltra riga"));
    }

    #[test]
    fn test_flag_table_like_blocks() {
        let blocks = vec![
            PageBlock::new("Lotto | Importo\n1 | 1000").with_level(2),
            PageBlock::new("testo normale"),
            PageBlock::table(vec![vec!["x".into()]]),
        ];
        let flagged = flag_table_like_blocks(&blocks);
        assert_eq!(flagged[0].block_type, BlockType::TableBlock);
        assert_eq!(flagged[0].level, None);
        assert_eq!(flagged[1].block_type, BlockType::Paragraph);
        assert_eq!(flagged[2], blocks[2]);
    }
}
