use epub_reflow::cfi;
use epub_reflow::{
    Book, Cfi, CfiCodec, CfiTarget, Chapter, ColorValue, Element, Highlight, HighlightIndex,
    PositionResolver, ReflowError, SpineItem,
};
use epub_reflow_paginate::{page_index_for_paragraph, paginate, MonospaceMeasurer, PaginationConfig};
use proptest::prelude::*;

fn sample_book() -> Book {
    let chapter_one = Chapter::new("text/ch01.xhtml")
        .with_title("Loomings")
        .with_body(vec![
            Element::new("h1").with_id("ch01").with_text("Loomings"),
            Element::new("p")
                .with_id("p1")
                .with_text("Call me Ishmael. Some years ago, never mind how long precisely."),
            Element::new("section").with_children(vec![
                Element::new("p").with_text("Whenever I find myself growing grim about the mouth."),
                Element::new("blockquote")
                    .with_children(vec![Element::new("span").with_id("q1").with_text("Quoted.")]),
            ]),
        ]);
    let chapter_two = Chapter::new("text/ch02.xhtml")
        .with_title("The Carpet-Bag")
        .with_body(vec![
            Element::new("h1").with_id("ch02").with_text("The Carpet-Bag"),
            Element::new("p")
                .with_id("p1")
                .with_text("I stuffed a shirt or two into my old carpet-bag."),
            Element::new("p").with_text(""),
            Element::new("p").with_text("Quitting the good city of old Manhatto."),
        ]);
    Book::new(vec![chapter_one, chapter_two]).with_spine(vec![
        SpineItem::new("cover", "cover.xhtml"),
        SpineItem::new("c01", "text/ch01.xhtml"),
        SpineItem::new("c02", "text/ch02.xhtml"),
    ])
}

#[test]
fn every_paragraph_round_trips_through_cfi() {
    let book = sample_book();
    let doc = book.flatten();
    assert_eq!(doc.boundaries(), &[0, 4]);
    assert_eq!(doc.len(), 8);

    let codec = CfiCodec::new(&book, &doc);
    for (index, paragraph) in doc.paragraphs().iter().enumerate() {
        let generated = codec
            .generate(paragraph.chapter_index, CfiTarget::Paragraph(index))
            .unwrap();
        assert_eq!(
            codec.paragraph_index_for_str(Some(&generated)),
            Some(index),
            "{}",
            generated
        );
    }
}

#[test]
fn duplicate_ids_resolve_within_addressed_chapter() {
    let book = sample_book();
    let doc = book.flatten();
    let codec = CfiCodec::new(&book, &doc);

    let second = codec.generate(1, CfiTarget::Paragraph(5)).unwrap();
    assert_eq!(second, "epubcfi(/6/6[c02]!/4/4[p1])");
    assert_eq!(codec.paragraph_index_for_str(Some(&second)), Some(5));
    assert_eq!(
        codec.paragraph_index_for_str(Some("epubcfi(/6/4[c01]!/4/4[p1])")),
        Some(1)
    );
}

#[test]
fn chapter_level_cfi_opens_chapter_start() {
    let book = sample_book();
    let doc = book.flatten();
    let codec = CfiCodec::new(&book, &doc);
    let chapter = codec.generate_for_chapter(1, &[]).unwrap();
    assert_eq!(codec.paragraph_index_for_str(Some(&chapter)), Some(4));
}

#[test]
fn bad_cfis_are_ignored() {
    let book = sample_book();
    let doc = book.flatten();
    let codec = CfiCodec::new(&book, &doc);
    assert_eq!(codec.paragraph_index_for_str(None), None);
    assert_eq!(codec.paragraph_index_for_str(Some("not a cfi")), None);
    assert_eq!(codec.paragraph_index_for_str(Some("epubcfi(/6/x!/4)")), None);
    assert_eq!(codec.paragraph_index_for_str(Some("epubcfi(/6/40!/4/2)")), None);
    assert!(cfi::parse(Some("epubcfi(/6/4!/4/2)")).is_some());
    assert!("garbage".parse::<Cfi>().is_err());
}

#[test]
fn generation_rejects_out_of_range_input() {
    let book = sample_book();
    let doc = book.flatten();
    let codec = CfiCodec::new(&book, &doc);
    assert!(matches!(
        codec.generate(7, CfiTarget::Paragraph(0)),
        Err(ReflowError::ChapterOutOfBounds { index: 7, .. })
    ));
    assert!(matches!(
        codec.generate(0, CfiTarget::Paragraph(6)),
        Err(ReflowError::ParagraphNotInChapter { index: 6, chapter_index: 0 })
    ));
}

#[test]
fn reading_position_survives_repagination() {
    let book = sample_book();
    let doc = book.flatten();
    let resolver = doc.resolver().unwrap();
    let measurer = MonospaceMeasurer::default();

    let narrow = paginate(doc.paragraphs(), &PaginationConfig::for_page(160.0, 120.0), &measurer);
    let wide = paginate(doc.paragraphs(), &PaginationConfig::for_page(600.0, 900.0), &measurer);
    assert!(narrow.len() > wide.len());

    let anchor = narrow[narrow.len() / 2].paragraph_indexes[0];
    let chapter = resolver.chapter_index_for(anchor).unwrap();
    let within = resolver.paragraph_index_for(anchor);
    let restored = resolver.absolute_position(chapter, within).unwrap();
    assert_eq!(restored, anchor);
    assert!(wide[page_index_for_paragraph(&wide, restored).unwrap()]
        .paragraph_indexes
        .contains(&restored));
}

#[test]
fn highlights_render_against_flattened_text() {
    let book = sample_book();
    let doc = book.flatten();
    let mut index = HighlightIndex::new();
    index.add(Highlight::new("Ishmael", 1, ColorValue::YELLOW));
    let stale = index.add(Highlight::new("no longer present", 1, ColorValue::PINK));

    let text = doc.paragraph(1).unwrap().text();
    let spans = index.render(1, text);
    assert_eq!(spans.len(), 3);
    assert_eq!(spans[1].text, "Ishmael");
    assert_eq!(spans.iter().map(|s| s.text).collect::<String>(), text);

    assert!(index.remove(stale).is_some());
    assert_eq!(index.len(), 1);
}

fn chapters_from_sizes(sizes: &[usize]) -> Vec<Chapter> {
    sizes
        .iter()
        .enumerate()
        .map(|(c, &n)| {
            Chapter::new(format!("c{}.xhtml", c)).with_body(
                (0..n)
                    .map(|p| Element::new("p").with_text(format!("chapter {} paragraph {}", c, p)))
                    .collect(),
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_resolver_round_trips(sizes in prop::collection::vec(0usize..12, 1..10)) {
        let chapters = chapters_from_sizes(&sizes);
        let doc = epub_reflow::flatten(&chapters);
        let resolver = doc.resolver().unwrap();
        for abs in 0..doc.len() {
            let chapter = resolver.chapter_index_for(abs).unwrap();
            prop_assert_eq!(doc.paragraph(abs).unwrap().chapter_index, chapter);
            let within = resolver.paragraph_index_for(abs);
            prop_assert_eq!(resolver.absolute_position(chapter, within), Some(abs));
        }
    }

    #[test]
    fn prop_flatten_is_deterministic(sizes in prop::collection::vec(0usize..8, 0..8)) {
        let chapters = chapters_from_sizes(&sizes);
        let first = epub_reflow::flatten(&chapters);
        let second = epub_reflow::flatten(&chapters);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), sizes.iter().sum::<usize>());
        let mut expected = Vec::new();
        let mut running = 0;
        for size in &sizes {
            expected.push(running);
            running += size;
        }
        prop_assert_eq!(first.boundaries(), expected.as_slice());
    }

    #[test]
    fn prop_boundaries_validate(boundaries in prop::collection::vec(0usize..50, 0..8)) {
        let valid = boundaries.first() == Some(&0)
            && boundaries.windows(2).all(|w| w[0] <= w[1]);
        prop_assert_eq!(PositionResolver::from_boundaries(boundaries).is_ok(), valid);
    }
}
