//! DOCX document parser.
//!
//! Reads the WordprocessingML parts straight out of the ZIP container.
//! Paragraphs whose style is a `Heading N` become headings of level N;
//! tables become `table_block`s with their cell grid. There is no page
//! geometry, so the whole document is a single page.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::ingest::{DocumentParser, Extraction};
use crate::model::{BlockType, DocumentMetadata, Page, PageBlock};
use crate::text::TextNormalizer;

use super::options::ParseOptions;

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const CORE_PROPS_PART: &str = "docProps/core.xml";
const APP_PROPS_PART: &str = "docProps/app.xml";

/// DOCX document parser.
#[derive(Debug, Clone, Default)]
pub struct DocxParser {
    normalizer: TextNormalizer,
}

impl DocxParser {
    /// Create a parser with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with custom options.
    ///
    /// Only the fallback encoding applies to DOCX.
    pub fn with_options(options: ParseOptions) -> Result<Self> {
        Ok(Self {
            normalizer: TextNormalizer::new(&options.fallback_encoding)?,
        })
    }

    /// Open and parse a DOCX file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Extraction> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let data = std::fs::read(path)?;
        self.parse_data(&data)
    }

    /// Parse a DOCX held in memory.
    pub fn parse_data(&self, data: &[u8]) -> Result<Extraction> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;

        let document = read_part(&mut archive, DOCUMENT_PART)?
            .ok_or_else(|| Error::CorruptDocument(format!("DOCX container: missing {}", DOCUMENT_PART)))?;
        let styles = match read_part(&mut archive, STYLES_PART)? {
            Some(xml) => parse_style_names(&xml)?,
            None => HashMap::new(),
        };

        let blocks = self.parse_body(&document, &styles)?;
        log::debug!("parsed DOCX: {} blocks", blocks.len());

        let mut metadata = match read_part(&mut archive, CORE_PROPS_PART)? {
            Some(xml) => parse_core_properties(&xml)?,
            None => DocumentMetadata::default(),
        };
        if let Some(xml) = read_part(&mut archive, APP_PROPS_PART)? {
            metadata.creator = parse_application(&xml)?;
        }

        Ok(Extraction::new(vec![Page::new(1, blocks)]).with_metadata(metadata))
    }

    /// Walk `word/document.xml` and emit blocks in document order.
    fn parse_body(&self, xml: &str, styles: &HashMap<String, String>) -> Result<Vec<PageBlock>> {
        let mut reader = Reader::from_str(xml);
        let mut walker = BodyWalker::new(&self.normalizer, styles);

        loop {
            match reader.read_event()? {
                Event::Start(e) => walker.start(&e),
                Event::Empty(e) => {
                    walker.start(&e);
                    walker.end(e.local_name().as_ref());
                }
                Event::End(e) => walker.end(e.local_name().as_ref()),
                Event::Text(t) => {
                    if walker.in_text {
                        let text = t.unescape()?;
                        walker.push_text(&text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(walker.blocks)
    }
}

impl DocumentParser for DocxParser {
    fn supported_extensions(&self) -> &[&str] {
        &["docx", "doc"]
    }

    fn name(&self) -> &str {
        "docx"
    }

    fn parse(&self, path: &Path) -> Result<Extraction> {
        self.parse_file(path)
    }

    fn parse_bytes(&self, bytes: &[u8]) -> Result<Extraction> {
        self.parse_data(bytes)
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Heading level for a style named like `Heading 2` / `heading2`.
pub fn heading_level_for_style(style: &str) -> Option<u8> {
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let rest = compact.strip_prefix("heading")?;
    Some(rest.parse::<u8>().ok().filter(|level| *level > 0).unwrap_or(1))
}

#[derive(Debug, Default)]
struct ParagraphState {
    text: String,
    style: Option<String>,
}

#[derive(Debug, Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    row: Option<Vec<String>>,
    cell: Option<Vec<String>>,
}

struct BodyWalker<'a> {
    normalizer: &'a TextNormalizer,
    styles: &'a HashMap<String, String>,
    blocks: Vec<PageBlock>,
    paragraph: Option<ParagraphState>,
    tables: Vec<TableState>,
    in_text: bool,
}

impl<'a> BodyWalker<'a> {
    fn new(normalizer: &'a TextNormalizer, styles: &'a HashMap<String, String>) -> Self {
        Self {
            normalizer,
            styles,
            blocks: Vec::new(),
            paragraph: None,
            tables: Vec::new(),
            in_text: false,
        }
    }

    fn clean(&self, text: &str) -> String {
        self.normalizer.normalize_str(text).trim().to_string()
    }

    fn push_text(&mut self, text: &str) {
        if let Some(p) = self.paragraph.as_mut() {
            p.text.push_str(text);
        }
    }

    fn start(&mut self, e: &BytesStart) {
        match e.local_name().as_ref() {
            b"p" => self.paragraph = Some(ParagraphState::default()),
            b"pStyle" => {
                if let (Some(p), Some(id)) = (self.paragraph.as_mut(), attr_value(e, b"val")) {
                    p.style = Some(self.styles.get(&id).cloned().unwrap_or(id));
                }
            }
            b"t" => self.in_text = true,
            b"tab" => self.push_text("\t"),
            b"br" | b"cr" => self.push_text("\n"),
            b"tbl" => self.tables.push(TableState::default()),
            b"tr" => {
                if let Some(table) = self.tables.last_mut() {
                    table.row = Some(Vec::new());
                }
            }
            b"tc" => {
                if let Some(table) = self.tables.last_mut() {
                    table.cell = Some(Vec::new());
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, local_name: &[u8]) {
        match local_name {
            b"t" => self.in_text = false,
            b"p" => {
                if let Some(p) = self.paragraph.take() {
                    self.finish_paragraph(p);
                }
            }
            b"tc" => {
                let cell = self
                    .tables
                    .last_mut()
                    .and_then(|t| t.cell.take())
                    .map(|paragraphs| paragraphs.join("\n"));
                if let Some(text) = cell {
                    let text = self.clean(&text);
                    if let Some(row) = self.tables.last_mut().and_then(|t| t.row.as_mut()) {
                        row.push(text);
                    }
                }
            }
            b"tr" => {
                if let Some(table) = self.tables.last_mut() {
                    if let Some(row) = table.row.take() {
                        table.rows.push(row);
                    }
                }
            }
            b"tbl" => {
                if let Some(table) = self.tables.pop() {
                    self.finish_table(table);
                }
            }
            _ => {}
        }
    }

    fn finish_paragraph(&mut self, p: ParagraphState) {
        // paragraphs inside a table cell feed the cell text
        if let Some(cell) = self.tables.last_mut().and_then(|t| t.cell.as_mut()) {
            cell.push(p.text);
            return;
        }

        let text = self.clean(&p.text);
        if text.is_empty() {
            return;
        }
        let mut block = PageBlock::new(text);
        if let Some(style) = p.style {
            if let Some(level) = heading_level_for_style(&style) {
                block = block.with_type(BlockType::Heading).with_level(level);
            }
            block = block.with_style(style);
        }
        self.blocks.push(block);
    }

    fn finish_table(&mut self, table: TableState) {
        if table.rows.is_empty() {
            return;
        }
        // a nested table is flattened into its parent cell
        if let Some(cell) = self.tables.last_mut().and_then(|t| t.cell.as_mut()) {
            cell.push(PageBlock::table(table.rows).text);
            return;
        }
        self.blocks.push(PageBlock::table(table.rows));
    }
}

/// Map style ids to style names from `word/styles.xml`.
fn parse_style_names(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut names = HashMap::new();
    let mut current_id: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"style" => current_id = attr_value(&e, b"styleId"),
                b"name" => {
                    if let (Some(id), Some(name)) = (current_id.as_ref(), attr_value(&e, b"val")) {
                        names.insert(id.clone(), name);
                    }
                }
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"style" => current_id = None,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(names)
}

/// Read title, author, subject and dates from `docProps/core.xml`.
fn parse_core_properties(xml: &str) -> Result<DocumentMetadata> {
    let mut metadata = DocumentMetadata::default();
    for (element, value) in leaf_values(xml)? {
        match element.as_str() {
            "title" => metadata.title = Some(value),
            "creator" => metadata.author = Some(value),
            "subject" => metadata.subject = Some(value),
            "created" => metadata.created = parse_w3c_date(&value),
            "modified" => metadata.modified = parse_w3c_date(&value),
            _ => {}
        }
    }
    Ok(metadata)
}

/// Authoring application from `docProps/app.xml`.
fn parse_application(xml: &str) -> Result<Option<String>> {
    Ok(leaf_values(xml)?
        .into_iter()
        .find(|(element, _)| element == "Application")
        .map(|(_, value)| value))
}

/// `(local element name, trimmed text)` for every non-empty text node.
fn leaf_values(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut current: Option<String> = None;
    let mut values = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                current = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::Text(t) => {
                if let Some(element) = current.as_ref() {
                    let text = t.unescape()?;
                    let text = text.trim();
                    if !text.is_empty() {
                        values.push((element.clone(), text.to_string()));
                    }
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(values)
}

fn parse_w3c_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
