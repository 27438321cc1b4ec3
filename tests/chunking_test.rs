//! Property tests for layout post-processing, filtering and chunking.

use proptest::prelude::*;

use tenderdoc::chunking::build_spans;
use tenderdoc::parser::{
    merge_label_value_blocks, HeadingClassifier, RepetitionFilter, RepetitionOptions,
};
use tenderdoc::{BlockType, DynamicChunker, Page, PageBlock, TokenChunker, TokenChunkerConfig};

fn valid_config() -> impl Strategy<Value = TokenChunkerConfig> {
    (2usize..200)
        .prop_flat_map(|max| (Just(max), 1..=max, 0..max))
        .prop_map(|(max, min, overlap)| TokenChunkerConfig::new(max, min, overlap))
}

fn block_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{3,12}( [a-z]{2,10}){0,6}",
        "Art\\. [1-9][0-9]? [A-Z][a-z]{3,10}",
        "CAPO [IVX]{1,3} - [A-Z]{4,12}",
        "[a-z]{3,10}:",
    ]
}

fn block() -> impl Strategy<Value = PageBlock> {
    (block_text(), 0.0f32..800.0, prop::sample::select(vec![9.0f32, 10.0, 12.0, 16.0]), any::<bool>())
        .prop_map(|(text, y, size, bold)| {
            let font = if bold { "Helvetica-Bold" } else { "Helvetica" };
            PageBlock::new(text)
                .with_bbox([72.0, y, 400.0, y + size])
                .with_font(font, size)
        })
}

fn pages() -> impl Strategy<Value = Vec<Page>> {
    prop::collection::vec(prop::collection::vec(block(), 0..8), 1..6).prop_map(|pages| {
        pages
            .into_iter()
            .enumerate()
            .map(|(i, blocks)| Page::new(i as u32 + 1, blocks).with_size(595.0, 842.0))
            .collect()
    })
}

proptest! {
    // ==== Token windows ====

    #[test]
    fn spans_are_contiguous_with_overlap(n in 0usize..3000, config in valid_config()) {
        let spans = build_spans(n, &config);

        if n == 0 {
            prop_assert!(spans.is_empty());
        } else {
            prop_assert_eq!(spans[0].0, 0);
        }
        for &(start, end) in &spans {
            prop_assert!(start < end && end <= n);
            prop_assert!(end - start <= config.max_tokens);
        }
        for pair in spans.windows(2) {
            prop_assert_eq!(pair[1].0, pair[0].1 - config.overlap_tokens);
            prop_assert!(pair[1].1 - pair[1].0 >= config.min_tokens);
        }
    }

    #[test]
    fn windows_never_exceed_max_tokens(words in prop::collection::vec("[a-z]{1,8}", 0..400)) {
        let chunk = tenderdoc::Chunk {
            id: "c".into(),
            title: "CAPO I".into(),
            heading_level: 1,
            text: words.join(" "),
            blocks: vec![],
            page_numbers: vec![1],
        };
        let chunker = TokenChunker::new(TokenChunkerConfig::new(50, 20, 10)).unwrap();
        for window in chunker.chunk_one(&chunk) {
            prop_assert!(window.text.split_whitespace().count() <= 50);
            prop_assert!(!window.text.is_empty());
            prop_assert_eq!(&window.source_chunk_id, "c");
        }
    }

    // ==== Page-level passes ====

    #[test]
    fn classification_keeps_blocks(blocks in prop::collection::vec(block(), 0..20)) {
        let classified = HeadingClassifier::default().classify(&blocks);
        prop_assert_eq!(classified.len(), blocks.len());
        for (before, after) in blocks.iter().zip(&classified) {
            prop_assert_eq!(&before.text, &after.text);
            prop_assert_eq!(before.bbox, after.bbox);
            match after.level {
                Some(level) => {
                    prop_assert_eq!(after.block_type, BlockType::Heading);
                    prop_assert!((1..=6).contains(&level));
                }
                None => prop_assert!(!after.is_heading()),
            }
        }
    }

    #[test]
    fn repetition_filter_is_idempotent(pages in pages()) {
        let filter = RepetitionFilter::new(RepetitionOptions::new().with_page_size(true));
        let once = filter.apply(&pages);
        let twice = filter.apply(&once);
        prop_assert_eq!(&once, &twice);

        for (before, after) in pages.iter().zip(&once) {
            prop_assert_eq!(before.page_number, after.page_number);
            prop_assert!(after.blocks.len() <= before.blocks.len());
        }
    }

    #[test]
    fn label_merge_never_grows(blocks in prop::collection::vec(block(), 0..20)) {
        let merged = merge_label_value_blocks(blocks.clone());
        prop_assert!(merged.len() <= blocks.len());
        let labels = blocks.iter().filter(|b| b.text.trim_end().ends_with(':')).count();
        prop_assert!(merged.len() + labels >= blocks.len());
    }

    // ==== Sections ====

    #[test]
    fn section_pages_come_from_input(pages in pages(), preamble in any::<bool>()) {
        let classified: Vec<Page> = pages
            .iter()
            .map(|p| p.with_blocks(HeadingClassifier::default().classify(&p.blocks)))
            .collect();
        let chunks = DynamicChunker::new().with_preamble(preamble).build_chunks(&classified);
        let numbers: Vec<u32> = classified.iter().map(|p| p.page_number).collect();

        for chunk in &chunks {
            prop_assert!(!chunk.blocks.is_empty());
            prop_assert!(chunk.page_numbers.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(chunk.page_numbers.iter().all(|n| numbers.contains(n)));
            prop_assert!(chunk.blocks.iter().all(|b| b.page_number.is_some()));
        }
        for chunk in chunks.iter().skip(1) {
            prop_assert_eq!(chunk.heading_level, 1);
        }
    }
}

// ==== Fixed cases ====

#[test]
fn test_article_heading_level() {
    let blocks = vec![
        PageBlock::new("Art. 5 Obblighi del fornitore").with_font("Helvetica", 10.0),
        PageBlock::new("Il fornitore garantisce la continuita del servizio.").with_font("Helvetica", 10.0),
    ];
    let classified = HeadingClassifier::default().classify(&blocks);
    assert_eq!(classified[0].heading_level(), Some(2));
    assert_eq!(classified[1].block_type, BlockType::Paragraph);
}

#[test]
fn test_large_bold_article_keeps_article_level() {
    let mut blocks = vec![PageBlock::new("Art. 5 Obblighi del fornitore").with_font("Helvetica-Bold", 20.0)];
    for text in [
        "Il fornitore garantisce la continuita del servizio.",
        "Le prestazioni sono rese nei giorni feriali.",
        "Il personale impiegato e in regola con la normativa.",
    ] {
        blocks.push(PageBlock::new(text).with_font("Helvetica", 10.0));
    }
    let classified = HeadingClassifier::default().classify(&blocks);
    assert_eq!(classified[0].heading_level(), Some(2));
    assert!(classified[1..].iter().all(|b| b.block_type == BlockType::Paragraph));
}

#[test]
fn test_label_value_merge() {
    let blocks = vec![
        PageBlock::new("Importo a base d'asta:").with_bbox([72.0, 100.0, 200.0, 110.0]),
        PageBlock::new("120.000 euro").with_bbox([210.0, 100.0, 300.0, 110.0]),
        PageBlock::new("Scadenza"),
    ];
    let merged = merge_label_value_blocks(blocks);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].text, "Importo a base d'asta: 120.000 euro");
    assert_eq!(merged[0].bbox, Some([72.0, 100.0, 300.0, 110.0]));
}

#[test]
fn test_trailing_tokens_dropped_below_minimum() {
    let spans = build_spans(1000, &TokenChunkerConfig::default());
    assert_eq!(spans, vec![(0, 800)]);
}
