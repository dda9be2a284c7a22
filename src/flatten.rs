//! Flattening of the chapter tree into one ordered paragraph stream.

use crate::book::{element_step, Chapter, Element, ElementPath};
use crate::error::ReflowError;
use crate::position::{ChapterBoundaries, PositionResolver};

/// One paragraph-bearing element in the flat stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Paragraph<'a> {
    /// Owning chapter, by position in the chapter list.
    pub chapter_index: usize,
    /// The element, borrowed from the book.
    pub element: &'a Element,
    /// CFI element steps from the chapter `<body>` to `element`.
    pub path: ElementPath,
}

impl<'a> Paragraph<'a> {
    /// Paragraph text.
    pub fn text(&self) -> &'a str {
        &self.element.text
    }

    /// Whether the paragraph has no visible text.
    pub fn is_blank(&self) -> bool {
        self.element.text.trim().is_empty()
    }
}

/// Flattener output: paragraphs and the chapter boundary table.
///
/// Built once per loaded document; a new document replaces it wholesale.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatDocument<'a> {
    paragraphs: Vec<Paragraph<'a>>,
    boundaries: Vec<usize>,
}

impl<'a> FlatDocument<'a> {
    pub fn paragraphs(&self) -> &[Paragraph<'a>] {
        &self.paragraphs
    }

    pub fn paragraph(&self, index: usize) -> Option<&Paragraph<'a>> {
        self.paragraphs.get(index)
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn chapter_count(&self) -> usize {
        self.boundaries.len()
    }

    /// Chapter boundary table, one entry per chapter.
    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    /// Flat index range covered by `chapter_index`.
    pub fn chapter_range(&self, chapter_index: usize) -> Option<core::ops::Range<usize>> {
        let start = *self.boundaries.get(chapter_index)?;
        let end = self
            .boundaries
            .get(chapter_index + 1)
            .copied()
            .unwrap_or(self.paragraphs.len());
        Some(start..end)
    }

    /// Paragraphs of one chapter.
    pub fn chapter_paragraphs(&self, chapter_index: usize) -> &[Paragraph<'a>] {
        self.chapter_range(chapter_index)
            .and_then(|range| self.paragraphs.get(range))
            .unwrap_or(&[])
    }

    /// Position resolver over this document's boundaries.
    ///
    /// Fails with [`ReflowError::EmptyBoundaries`] for a document without
    /// chapters.
    pub fn resolver(&self) -> Result<PositionResolver, ReflowError> {
        let boundaries = ChapterBoundaries::new(self.boundaries.clone())?;
        Ok(PositionResolver::new(boundaries).with_paragraph_count(self.paragraphs.len()))
    }
}

/// Flatten `chapters` into paragraphs and chapter boundaries.
///
/// Paragraph-bearing elements are collected depth-first in document order;
/// their descendants are not visited. `boundaries[c]` is the length of the
/// output before chapter `c` is walked. An empty chapter list yields empty
/// paragraphs and empty boundaries.
pub fn flatten(chapters: &[Chapter]) -> FlatDocument<'_> {
    let mut paragraphs = Vec::with_capacity(chapters.len().saturating_mul(16));
    let mut boundaries = Vec::with_capacity(chapters.len());

    for (chapter_index, chapter) in chapters.iter().enumerate() {
        boundaries.push(paragraphs.len());
        let mut path = ElementPath::new();
        collect(&chapter.body, chapter_index, &mut path, &mut paragraphs);
    }

    log::debug!(
        "flattened {} chapters into {} paragraphs",
        chapters.len(),
        paragraphs.len()
    );

    FlatDocument {
        paragraphs,
        boundaries,
    }
}

fn collect<'a>(
    elements: &'a [Element],
    chapter_index: usize,
    path: &mut ElementPath,
    out: &mut Vec<Paragraph<'a>>,
) {
    for (idx, element) in elements.iter().enumerate() {
        path.push(element_step(idx));
        if element.is_paragraph_bearing() {
            out.push(Paragraph {
                chapter_index,
                element,
                path: path.clone(),
            });
        } else {
            collect(&element.children, chapter_index, path, out);
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapters() -> Vec<Chapter> {
        vec![
            Chapter::new("ch1.xhtml").with_body(vec![
                Element::new("h1").with_text("One"),
                Element::new("section").with_children(vec![
                    Element::new("p").with_id("a").with_text("Alpha"),
                    Element::new("div").with_children(vec![Element::new("p").with_text("Beta")]),
                ]),
            ]),
            Chapter::new("empty.xhtml"),
            Chapter::new("ch3.xhtml").with_body(vec![
                Element::new("p")
                    .with_text("Gamma with emphasis")
                    .with_children(vec![Element::new("em").with_text("emphasis")]),
                Element::new("div").with_text("Loose text"),
            ]),
        ]
    }

    #[test]
    fn test_flatten_order_and_boundaries() {
        let chapters = chapters();
        let doc = flatten(&chapters);
        let texts: Vec<&str> = doc.paragraphs().iter().map(|p| p.text()).collect();
        assert_eq!(
            texts,
            vec!["One", "Alpha", "Beta", "Gamma with emphasis", "Loose text"]
        );
        assert_eq!(doc.boundaries(), &[0, 3, 3]);
        assert_eq!(doc.paragraphs()[3].chapter_index, 2);
        assert_eq!(doc.chapter_count(), 3);
    }

    #[test]
    fn test_flatten_records_element_paths() {
        let chapters = chapters();
        let doc = flatten(&chapters);
        let paths: Vec<&[u32]> = doc.paragraphs().iter().map(|p| p.path.as_slice()).collect();
        assert_eq!(paths[0], &[2]);
        assert_eq!(paths[1], &[4, 2]);
        assert_eq!(paths[2], &[4, 4, 2]);
        assert_eq!(paths[3], &[2]);
        assert_eq!(paths[4], &[4]);
    }

    #[test]
    fn test_flatten_borrows_elements() {
        let chapters = chapters();
        let doc = flatten(&chapters);
        assert!(core::ptr::eq(
            doc.paragraphs()[1].element,
            &chapters[0].body[1].children[0]
        ));
    }

    #[test]
    fn test_flatten_empty_input() {
        let doc = flatten(&[]);
        assert!(doc.is_empty());
        assert!(doc.boundaries().is_empty());
        assert_eq!(doc.resolver(), Err(ReflowError::EmptyBoundaries));
    }

    #[test]
    fn test_chapter_range() {
        let chapters = chapters();
        let doc = flatten(&chapters);
        assert_eq!(doc.chapter_range(0), Some(0..3));
        assert_eq!(doc.chapter_range(1), Some(3..3));
        assert_eq!(doc.chapter_range(2), Some(3..5));
        assert_eq!(doc.chapter_range(3), None);
        assert!(doc.chapter_paragraphs(1).is_empty());
        assert_eq!(doc.chapter_paragraphs(2).len(), 2);
    }

    #[test]
    fn test_resolver_from_document() {
        let chapters = chapters();
        let doc = flatten(&chapters);
        let resolver = doc.resolver().unwrap();
        assert_eq!(resolver.chapter_index_for(3), Some(2));
        assert_eq!(resolver.paragraph_index_for(4), 1);
        assert_eq!(resolver.absolute_position(2, 1), Some(4));
        assert_eq!(resolver.absolute_position(2, 2), None);
    }
}
