//! tenderdoc CLI - tender document parsing and chunking tool

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use tenderdoc::ocr::{count_text_chars, OcrMyPdf};
use tenderdoc::parser::LopdfBackend;
use tenderdoc::render::{self, JsonFormat};
use tenderdoc::{
    DynamicChunker, IngestionOptions, IngestionService, OcrFailurePolicy, ParseOptions,
    ParsedDocument, TokenChunker, TokenChunkerConfig,
};

#[derive(Parser)]
#[command(name = "tenderdoc")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Parse tender documents (PDF, DOCX) into structured JSON and chunks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse documents into pages of typed blocks
    Parse {
        /// Input PDF or DOCX files
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (single input) or directory (several inputs)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputKind,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        ingest: IngestArgs,
    },

    /// Group a document into heading-anchored sections
    Chunks {
        /// Input PDF or DOCX file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Omit the block list of each section
        #[arg(long)]
        no_blocks: bool,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        ingest: IngestArgs,

        #[command(flatten)]
        chunking: ChunkArgs,
    },

    /// Slice a document into overlapping token windows
    Tokens {
        /// Input PDF or DOCX file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// One JSON object per line
        #[arg(long)]
        jsonl: bool,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        ingest: IngestArgs,

        #[command(flatten)]
        chunking: ChunkArgs,

        #[command(flatten)]
        tokens: TokenArgs,
    },

    /// Report whether a PDF would be sent to OCR
    OcrCheck {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Minimum extractable characters for a text PDF
        #[arg(long, default_value_t = 200, env = "TENDERDOC_TEXT_THRESHOLD")]
        text_threshold: usize,
    },

    /// Show document information
    Info {
        /// Input PDF or DOCX file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        ingest: IngestArgs,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputKind {
    /// Parsed document as JSON
    Json,
    /// Plain text
    Text,
}

#[derive(Args)]
struct IngestArgs {
    /// Never run OCR
    #[arg(long, conflicts_with = "force_ocr")]
    no_ocr: bool,

    /// OCR every PDF
    #[arg(long)]
    force_ocr: bool,

    /// Parse the original file when OCR fails
    #[arg(long)]
    ocr_fallback: bool,

    /// Minimum extractable characters before a PDF counts as text-based
    #[arg(long, default_value_t = 200, env = "TENDERDOC_TEXT_THRESHOLD")]
    text_threshold: usize,

    /// Skip heading, table and repetition passes
    #[arg(long)]
    raw: bool,

    /// Last-resort encoding for undecodable text
    #[arg(long, default_value = "utf-8", env = "TENDERDOC_FALLBACK_ENCODING")]
    fallback_encoding: String,
}

impl IngestArgs {
    fn options(&self) -> IngestionOptions {
        let parse = if self.raw {
            ParseOptions::raw()
        } else {
            ParseOptions::default()
        };
        let policy = if self.ocr_fallback {
            OcrFailurePolicy::FallBack
        } else {
            OcrFailurePolicy::Abort
        };
        IngestionOptions::new()
            .with_parse_options(parse.with_fallback_encoding(self.fallback_encoding.clone()))
            .with_ocr(!self.no_ocr)
            .with_force_ocr(self.force_ocr)
            .with_text_threshold(self.text_threshold)
            .with_ocr_policy(policy)
    }

    fn service(&self) -> tenderdoc::Result<IngestionService> {
        IngestionService::new(self.options())
    }
}

#[derive(Args)]
struct ChunkArgs {
    /// Keep content before the first level-1 heading
    #[arg(long)]
    preamble: bool,

    /// Leave table blocks out of sections
    #[arg(long)]
    no_tables: bool,

    /// Deepest nested heading level
    #[arg(long, default_value_t = 6)]
    max_heading_level: u8,
}

impl ChunkArgs {
    fn chunker(&self) -> DynamicChunker {
        DynamicChunker::new()
            .with_preamble(self.preamble)
            .with_tables(!self.no_tables)
            .with_max_heading_level(self.max_heading_level)
    }
}

#[derive(Args)]
struct TokenArgs {
    /// Maximum tokens per window
    #[arg(long, default_value_t = 800, env = "TENDERDOC_MAX_TOKENS")]
    max_tokens: usize,

    /// Minimum tokens for a trailing window
    #[arg(long, default_value_t = 400, env = "TENDERDOC_MIN_TOKENS")]
    min_tokens: usize,

    /// Tokens shared by consecutive windows
    #[arg(long, default_value_t = 120, env = "TENDERDOC_OVERLAP_TOKENS")]
    overlap_tokens: usize,
}

impl TokenArgs {
    fn chunker(&self) -> tenderdoc::Result<TokenChunker> {
        TokenChunker::new(TokenChunkerConfig::new(
            self.max_tokens,
            self.min_tokens,
            self.overlap_tokens,
        ))
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            inputs,
            output,
            format,
            compact,
            ingest,
        } => cmd_parse(&inputs, output.as_deref(), format, json_format(compact), &ingest),
        Commands::Chunks {
            input,
            output,
            no_blocks,
            compact,
            ingest,
            chunking,
        } => cmd_chunks(
            &input,
            output.as_deref(),
            !no_blocks,
            json_format(compact),
            &ingest,
            &chunking,
        ),
        Commands::Tokens {
            input,
            output,
            jsonl,
            compact,
            ingest,
            chunking,
            tokens,
        } => cmd_tokens(
            &input,
            output.as_deref(),
            jsonl,
            json_format(compact),
            &ingest,
            &chunking,
            &tokens,
        ),
        Commands::OcrCheck {
            input,
            text_threshold,
        } => cmd_ocr_check(&input, text_threshold),
        Commands::Info { input, ingest } => cmd_info(&input, &ingest),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn json_format(compact: bool) -> JsonFormat {
    if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    }
}

fn emit(content: &str, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn render_document(
    doc: &ParsedDocument,
    kind: OutputKind,
    format: JsonFormat,
) -> tenderdoc::Result<String> {
    match kind {
        OutputKind::Json => render::to_json(doc, format),
        OutputKind::Text => Ok(render::to_text(doc)),
    }
}

fn cmd_parse(
    inputs: &[PathBuf],
    output: Option<&Path>,
    kind: OutputKind,
    format: JsonFormat,
    ingest: &IngestArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = ingest.service()?;

    if let [input] = inputs {
        let doc = service.parse_document(input, None)?;
        return emit(&render_document(&doc, kind, format)?, output);
    }

    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("tenderdoc_output"));
    fs::create_dir_all(&output_dir)?;

    let extension = match kind {
        OutputKind::Json => "json",
        OutputKind::Text => "txt",
    };

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut failures = 0;
    for input in inputs {
        let name = input.file_name().unwrap_or_default().to_string_lossy();
        pb.set_message(name.to_string());

        let written = service
            .parse_document(input, None)
            .and_then(|doc| render_document(&doc, kind, format))
            .and_then(|content| {
                let stem = input.file_stem().unwrap_or_default().to_string_lossy();
                let path = output_dir.join(format!("{}.{}", stem, extension));
                fs::write(&path, content)?;
                Ok(path)
            });

        match written {
            Ok(path) => pb.println(format!("{} {}", "Parsed".green(), path.display())),
            Err(e) => {
                failures += 1;
                pb.println(format!("{} {}: {}", "Failed".red(), input.display(), e));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("Done!");

    println!(
        "\n{} {} parsed, {} failed",
        "Summary:".bold(),
        inputs.len() - failures,
        failures
    );
    if failures > 0 {
        return Err(format!("{} document(s) failed", failures).into());
    }
    Ok(())
}

fn cmd_chunks(
    input: &Path,
    output: Option<&Path>,
    include_blocks: bool,
    format: JsonFormat,
    ingest: &IngestArgs,
    chunking: &ChunkArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = ingest.service()?.parse_document(input, None)?;
    let chunks = chunking.chunker().build_chunks(&doc.pages);
    log::info!("{}: {} sections", doc.filename, chunks.len());

    let json = render::chunks_to_json(&chunks, include_blocks, format)?;
    emit(&json, output)
}

fn cmd_tokens(
    input: &Path,
    output: Option<&Path>,
    jsonl: bool,
    format: JsonFormat,
    ingest: &IngestArgs,
    chunking: &ChunkArgs,
    tokens: &TokenArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    // validate window sizes before parsing
    let token_chunker = tokens.chunker()?;
    let doc = ingest.service()?.parse_document(input, None)?;
    let chunks = chunking.chunker().build_chunks(&doc.pages);
    let windows = token_chunker.chunk(&chunks);
    log::info!(
        "{}: {} sections, {} windows",
        doc.filename,
        chunks.len(),
        windows.len()
    );

    let content = if jsonl {
        render::to_json_lines(&windows)?
    } else {
        render::to_json(&windows, format)?
    };
    emit(content.trim_end(), output)
}

fn cmd_ocr_check(input: &Path, text_threshold: usize) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(tenderdoc::Error::NotFound(input.to_path_buf()).into());
    }
    let backend = LopdfBackend::load_file(input)?;
    let chars = count_text_chars(&backend);
    let engine = OcrMyPdf::new();

    println!("{}", "OCR Check".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Pages".bold(), backend.page_count());
    println!("{}: {}", "Extractable chars".bold(), chars);
    println!("{}: {}", "Threshold".bold(), text_threshold);

    let verdict = if chars < text_threshold {
        "Yes".yellow()
    } else {
        "No".green()
    };
    println!("{}: {}", "Needs OCR".bold(), verdict);

    let available = if engine.is_available() {
        "available".green()
    } else {
        "not found".red()
    };
    println!("{}: {}", "ocrmypdf".bold(), available);

    Ok(())
}

fn cmd_info(input: &Path, ingest: &IngestArgs) -> Result<(), Box<dyn std::error::Error>> {
    let doc = ingest.service()?.parse_document(input, None)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), doc.extension.trim_start_matches('.').to_uppercase());
    println!("{}: {}", "Pages".bold(), doc.total_pages);
    println!("{}: {}", "Language".bold(), doc.language);

    let metadata = &doc.metadata;
    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref subject) = metadata.subject {
        println!("{}: {}", "Subject".bold(), subject);
    }
    if let Some(ref creator) = metadata.creator {
        println!("{}: {}", "Creator".bold(), creator);
    }
    if let Some(ref producer) = metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for block in doc.pages.iter().flat_map(|p| p.blocks.iter()) {
        *by_type.entry(block.block_type.as_str()).or_insert(0) += 1;
    }
    let text = doc.plain_text();

    println!("{}: {}", "Blocks".bold(), doc.block_count());
    for (block_type, count) in &by_type {
        println!("  {} {}: {}", "─".dimmed(), block_type, count);
    }
    println!("{}: {}", "Words".bold(), text.split_whitespace().count());
    println!("{}: {}", "Characters".bold(), text.chars().count());
    println!(
        "{}: {}",
        "Sections".bold(),
        DynamicChunker::new().build_chunks(&doc.pages).len()
    );

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "tenderdoc".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Tender document parsing and chunking tool");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_flags() {
        let cli = Cli::try_parse_from([
            "tenderdoc",
            "parse",
            "bando.pdf",
            "--no-ocr",
            "--ocr-fallback",
            "--raw",
        ])
        .unwrap();
        let Commands::Parse { inputs, ingest, .. } = cli.command else {
            panic!("expected parse command");
        };
        assert_eq!(inputs, vec![PathBuf::from("bando.pdf")]);

        let options = ingest.options();
        assert!(!options.enable_ocr);
        assert_eq!(options.ocr_policy, OcrFailurePolicy::FallBack);
        assert!(!options.parse.detect_headings);
    }

    #[test]
    fn test_no_ocr_conflicts_with_force_ocr() {
        let result = Cli::try_parse_from(["tenderdoc", "info", "a.pdf", "--no-ocr", "--force-ocr"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_token_args_validated() {
        let cli = Cli::try_parse_from([
            "tenderdoc",
            "tokens",
            "a.pdf",
            "--max-tokens",
            "100",
            "--min-tokens",
            "200",
        ])
        .unwrap();
        let Commands::Tokens { tokens, .. } = cli.command else {
            panic!("expected tokens command");
        };
        assert!(tokens.chunker().is_err());
    }

    #[test]
    fn test_emit_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        emit("{}", Some(&path)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }
}
