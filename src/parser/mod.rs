//! Format parsers and the structural passes run over their output.

pub mod backend;
mod docx_parser;
mod headings;
mod layout;
mod options;
mod pdf_parser;
mod repetition;
mod table_detector;

pub use backend::{LopdfBackend, PdfBackend};
pub use docx_parser::{heading_level_for_style, DocxParser};
pub use headings::{is_bold_font, HeadingClassifier, HeadingOptions};
pub use layout::{
    extract_page_spans, is_list_item_text, merge_label_value_blocks, sort_reading_order,
    tag_list_items, LayoutAnalyzer, LayoutOptions, PageSpans, RawBlock, TextSpan,
};
pub use options::ParseOptions;
pub use pdf_parser::PdfParser;
pub use repetition::{block_signature, RepetitionFilter, RepetitionOptions};
pub use table_detector::{
    flag_table_like_blocks, is_table_like_text, DetectedTable, TableDetector, TableDetectorConfig,
    TableRowData,
};
