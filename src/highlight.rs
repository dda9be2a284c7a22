//! Highlight index and paragraph span rendering.
//!
//! Highlights store the literal text they cover plus the flat index of their
//! paragraph. At render time the stored text is searched for again in the
//! paragraph's current text; highlights whose text is no longer there are
//! skipped for that call.

use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Packed `0xAARRGGBB` color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorValue(pub u32);

impl ColorValue {
    pub const YELLOW: Self = Self(0xFFFF_EB3B);
    pub const GREEN: Self = Self(0xFF8B_C34A);
    pub const BLUE: Self = Self(0xFF64_B5F6);
    pub const PINK: Self = Self(0xFFF0_6292);

    pub fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(u32::from_be_bytes([a, r, g, b]))
    }

    /// `[a, r, g, b]` components.
    pub fn argb(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

/// Stable handle returned by [`HighlightIndex::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HighlightId(pub u64);

/// A user-created highlight over one paragraph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    /// Highlighted text, as selected.
    pub text: String,
    /// Flat paragraph index.
    pub paragraph_index: usize,
    pub color: ColorValue,
    /// Optional user note.
    pub note: Option<String>,
    pub created_at: SystemTime,
}

impl Highlight {
    /// New highlight stamped with the current time.
    pub fn new(text: impl Into<String>, paragraph_index: usize, color: ColorValue) -> Self {
        Self {
            text: text.into(),
            paragraph_index,
            color,
            note: None,
            created_at: SystemTime::now(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_created_at(mut self, created_at: SystemTime) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A run of paragraph text, highlighted or plain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span<'a> {
    pub text: &'a str,
    pub highlight: Option<ColorValue>,
}

impl<'a> Span<'a> {
    fn plain(text: &'a str) -> Self {
        Self {
            text,
            highlight: None,
        }
    }
}

/// Split `text` into plain and highlighted spans.
///
/// Highlights are ordered by the first occurrence of their text (stable for
/// ties), then matched left to right from a cursor, each at most once. A
/// highlight that does not occur at or after the cursor is skipped, so
/// overlapping highlights render only the part found first. The spans always
/// concatenate back to `text`.
pub fn render_spans<'a, 'h, I>(text: &'a str, highlights: I) -> Vec<Span<'a>>
where
    I: IntoIterator<Item = &'h Highlight>,
{
    let mut ordered: Vec<(usize, &Highlight)> = highlights
        .into_iter()
        .filter(|highlight| !highlight.text.is_empty())
        .map(|highlight| {
            let first = text.find(highlight.text.as_str()).unwrap_or(usize::MAX);
            (first, highlight)
        })
        .collect();
    ordered.sort_by_key(|(first, _)| *first);

    let mut spans = Vec::with_capacity(ordered.len() * 2 + 1);
    let mut cursor = 0;
    for (_, highlight) in ordered {
        let Some(found) = text[cursor..].find(highlight.text.as_str()) else {
            log::trace!(
                "highlight text not found in paragraph {} after offset {}",
                highlight.paragraph_index,
                cursor
            );
            continue;
        };
        let start = cursor + found;
        let end = start + highlight.text.len();
        if start > cursor {
            spans.push(Span::plain(&text[cursor..start]));
        }
        spans.push(Span {
            text: &text[start..end],
            highlight: Some(highlight.color),
        });
        cursor = end;
    }
    if cursor < text.len() {
        spans.push(Span::plain(&text[cursor..]));
    }
    spans
}

/// Session-owned highlights keyed by paragraph.
///
/// Insertion order is kept per paragraph, which is the tie-break order of
/// [`render_spans`].
#[derive(Clone, Debug, Default)]
pub struct HighlightIndex {
    by_paragraph: HashMap<usize, Vec<(HighlightId, Highlight)>>,
    locations: HashMap<HighlightId, usize>,
    next_id: u64,
}

impl HighlightIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a highlight and return its handle.
    pub fn add(&mut self, highlight: Highlight) -> HighlightId {
        let id = HighlightId(self.next_id);
        self.next_id += 1;
        self.locations.insert(id, highlight.paragraph_index);
        self.by_paragraph
            .entry(highlight.paragraph_index)
            .or_default()
            .push((id, highlight));
        id
    }

    /// Remove a highlight by handle.
    pub fn remove(&mut self, id: HighlightId) -> Option<Highlight> {
        let paragraph_index = self.locations.remove(&id)?;
        let entries = self.by_paragraph.get_mut(&paragraph_index)?;
        let pos = entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        let (_, removed) = entries.remove(pos);
        if entries.is_empty() {
            self.by_paragraph.remove(&paragraph_index);
        }
        Some(removed)
    }

    pub fn get(&self, id: HighlightId) -> Option<&Highlight> {
        let paragraph_index = self.locations.get(&id)?;
        self.by_paragraph
            .get(paragraph_index)?
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, highlight)| highlight)
    }

    /// Highlights of one paragraph in insertion order.
    pub fn highlights_for(&self, paragraph_index: usize) -> impl Iterator<Item = &Highlight> + '_ {
        self.by_paragraph
            .get(&paragraph_index)
            .into_iter()
            .flatten()
            .map(|(_, highlight)| highlight)
    }

    /// Whether a paragraph has any highlight.
    pub fn has_highlights(&self, paragraph_index: usize) -> bool {
        self.by_paragraph.contains_key(&paragraph_index)
    }

    /// Render one paragraph's current text with its highlights.
    pub fn render<'t>(&self, paragraph_index: usize, text: &'t str) -> Vec<Span<'t>> {
        render_spans(text, self.highlights_for(paragraph_index))
    }

    /// All highlights with their handles, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (HighlightId, &Highlight)> + '_ {
        self.by_paragraph
            .values()
            .flatten()
            .map(|(id, highlight)| (*id, highlight))
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl Extend<Highlight> for HighlightIndex {
    fn extend<T: IntoIterator<Item = Highlight>>(&mut self, iter: T) {
        for highlight in iter {
            self.add(highlight);
        }
    }
}

impl FromIterator<Highlight> for HighlightIndex {
    fn from_iter<T: IntoIterator<Item = Highlight>>(iter: T) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}
