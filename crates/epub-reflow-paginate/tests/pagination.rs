use epub_reflow::{flatten, Chapter, Element};
use epub_reflow_paginate::{
    paginate, paginate_texts, page_index_for_paragraph, MonospaceMeasurer, Page,
    PaginationConfig, TextDirection, TextStyle,
};
use proptest::prelude::*;

fn byte_height(text: &str, _: &TextStyle, _: f64, _: TextDirection) -> f64 {
    text.len() as f64
}

fn unpadded(width: f64, height: f64) -> PaginationConfig {
    PaginationConfig {
        paragraph_padding: 0.0,
        ..PaginationConfig::for_page(width, height)
    }
}

fn indexes(pages: &[Page]) -> Vec<Vec<usize>> {
    pages.iter().map(|p| p.paragraph_indexes.clone()).collect()
}

#[test]
fn oversized_paragraph_is_split_into_chunks() {
    let long: String = (0..25).map(|n| format!("Sentence number {:02}. ", n)).collect();
    assert_eq!(long.len(), 500);
    let texts = vec!["Intro.".to_string(), long.clone(), "Outro.".to_string()];
    let config = unpadded(300.0, 200.0);

    let pages = paginate_texts(&texts, &config, &byte_height);
    let chunks: Vec<&Page> = pages.iter().filter(|p| p.paragraph_indexes == [1]).collect();
    assert!(chunks.len() >= 2);
    assert!(chunks
        .iter()
        .all(|p| p.estimated_height <= config.height_threshold()));

    let rebuilt: String = chunks
        .iter()
        .map(|p| &long[p.fragment.clone().unwrap()])
        .collect();
    assert_eq!(rebuilt, long);

    assert_eq!(pages.first().unwrap().paragraph_indexes, vec![0]);
    assert_eq!(pages.last().unwrap().paragraph_indexes, vec![2]);
    assert_eq!(page_index_for_paragraph(&pages, 1), Some(1));
}

#[test]
fn sentence_without_breaks_splits_on_words() {
    let long = "word ".repeat(120);
    let pages = paginate_texts(&[long.as_str()], &unpadded(300.0, 100.0), &byte_height);
    assert!(pages.len() >= 6);
    assert!(pages.iter().all(|p| p.estimated_height <= 95.0));
}

#[test]
fn rtl_paragraphs_reach_measurer_with_direction() {
    let measure = |_: &str, _: &TextStyle, _: f64, dir: TextDirection| {
        if dir.is_rtl() {
            150.0
        } else {
            10.0
        }
    };
    let texts = ["Left to right.", "שלום עולם.", "More text."];
    let pages = paginate_texts(&texts, &unpadded(300.0, 160.0), &measure);
    assert_eq!(indexes(&pages), vec![vec![0], vec![1], vec![2]]);
}

#[test]
fn paginates_flattened_chapters() {
    let chapters = vec![
        Chapter::new("c1.xhtml").with_body(vec![
            Element::new("h1").with_text("Chapter One"),
            Element::new("p").with_text("First paragraph of the book."),
            Element::new("p").with_text(""),
        ]),
        Chapter::new("c2.xhtml").with_body(vec![
            Element::new("h1").with_text("Chapter Two"),
            Element::new("p").with_text("Second chapter body."),
        ]),
    ];
    let doc = flatten(&chapters);
    let config = PaginationConfig::for_page(320.0, 480.0);
    let pages = paginate(doc.paragraphs(), &config, &MonospaceMeasurer::default());
    assert_eq!(indexes(&pages), vec![vec![0, 1, 2, 3, 4]]);
}

#[test]
fn repagination_is_deterministic() {
    let texts: Vec<String> = (0..40)
        .map(|n| format!("Paragraph {} with some words to wrap across lines.", n))
        .collect();
    let config = PaginationConfig::for_page(240.0, 320.0);
    let measurer = MonospaceMeasurer::default();
    assert_eq!(
        paginate_texts(&texts, &config, &measurer),
        paginate_texts(&texts, &config, &measurer)
    );
}

proptest! {
    #[test]
    fn prop_every_visible_paragraph_is_paged_in_order(
        texts in prop::collection::vec("[a-z .!?]{0,300}", 0..24),
        width in 80.0f64..600.0,
        height in 60.0f64..900.0,
    ) {
        let config = PaginationConfig::for_page(width, height);
        let pages = paginate_texts(&texts, &config, &MonospaceMeasurer::default());

        let flat: Vec<usize> = pages.iter().flat_map(|p| p.paragraph_indexes.iter().copied()).collect();
        prop_assert!(flat.windows(2).all(|w| w[0] <= w[1]));
        for (idx, text) in texts.iter().enumerate() {
            if !text.trim().is_empty() {
                prop_assert!(flat.contains(&idx));
            }
        }
        if texts.iter().all(|t| t.trim().is_empty()) {
            prop_assert!(pages.is_empty());
        }
    }

    #[test]
    fn prop_split_fragments_rebuild_paragraph(
        words in prop::collection::vec("[a-z]{1,12}[.!?]?", 1..200),
    ) {
        let text = words.join(" ");
        let config = PaginationConfig::for_page(200.0, 120.0);
        let pages = paginate_texts(&[text.as_str()], &config, &MonospaceMeasurer::default());
        prop_assert!(!pages.is_empty());
        if pages.len() > 1 {
            let rebuilt: String = pages
                .iter()
                .map(|p| p.fragment.clone().map(|r| &text[r]).unwrap_or(""))
                .collect();
            prop_assert_eq!(rebuilt, text);
        } else {
            prop_assert!(pages[0].fragment.is_none());
        }
    }
}
