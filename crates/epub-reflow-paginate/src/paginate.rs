//! Greedy height-based pagination.

use core::ops::Range;

use epub_reflow::Paragraph;
use serde::{Deserialize, Serialize};

use crate::measure::{TextDirection, TextMeasurer, TextStyle};

/// Page geometry and spacing used by [`paginate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaginationConfig {
    /// Page width in pixels.
    pub page_width: f64,
    /// Page height in pixels.
    pub page_height: f64,
    /// Left and right inset; text wraps at `page_width - 2 * horizontal_inset`.
    pub horizontal_inset: f64,
    /// Height added after every non-blank paragraph.
    pub paragraph_padding: f64,
    /// Height charged for a blank paragraph inside a page.
    pub blank_paragraph_height: f64,
    /// Share of `page_height` a page may fill before it is closed.
    pub fill_ratio: f64,
    /// Style passed through to the measurer.
    pub text_style: TextStyle,
}

impl PaginationConfig {
    /// Defaults for a page of the given size.
    pub fn for_page(page_width: f64, page_height: f64) -> Self {
        Self {
            page_width,
            page_height,
            horizontal_inset: 16.0,
            paragraph_padding: 8.0,
            blank_paragraph_height: 8.0,
            fill_ratio: 0.95,
            text_style: TextStyle::default(),
        }
    }

    /// Wrap width handed to the measurer.
    pub fn available_width(&self) -> f64 {
        (self.page_width - 2.0 * self.horizontal_inset).max(0.0)
    }

    /// Height a page may reach before the next paragraph moves on.
    pub fn height_threshold(&self) -> f64 {
        self.page_height * self.fill_ratio
    }

    fn is_degenerate(&self) -> bool {
        let threshold = self.height_threshold();
        !(threshold.is_finite() && threshold > 0.0 && self.available_width() > 0.0)
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self::for_page(480.0, 800.0)
    }
}

/// One page of the paginated stream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Flat paragraph indexes shown on this page, ascending and contiguous
    /// apart from skipped leading blanks.
    pub paragraph_indexes: Vec<usize>,
    /// Sum of measured paragraph heights plus padding.
    pub estimated_height: f64,
    /// Byte range of the paragraph text shown, for pages holding one chunk
    /// of a split paragraph.
    pub fragment: Option<Range<usize>>,
}

impl Page {
    pub fn first_paragraph(&self) -> Option<usize> {
        self.paragraph_indexes.first().copied()
    }

    pub fn last_paragraph(&self) -> Option<usize> {
        self.paragraph_indexes.last().copied()
    }

    pub fn contains_paragraph(&self, paragraph_index: usize) -> bool {
        self.paragraph_indexes.contains(&paragraph_index)
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment.is_some()
    }
}

/// Paginate a flattened paragraph stream.
pub fn paginate<M>(paragraphs: &[Paragraph<'_>], config: &PaginationConfig, measurer: &M) -> Vec<Page>
where
    M: TextMeasurer + ?Sized,
{
    let texts: Vec<&str> = paragraphs.iter().map(Paragraph::text).collect();
    paginate_texts(&texts, config, measurer)
}

/// Paginate raw paragraph texts, indexed by position in `texts`.
///
/// Pages are filled greedily up to [`PaginationConfig::height_threshold`].
/// Blank paragraphs never start a page. A paragraph that alone exceeds the
/// threshold is split on sentence boundaries, falling back to word boundaries
/// for oversized sentences, and each chunk becomes its own page.
pub fn paginate_texts<T, M>(texts: &[T], config: &PaginationConfig, measurer: &M) -> Vec<Page>
where
    T: AsRef<str>,
    M: TextMeasurer + ?Sized,
{
    if texts.is_empty() {
        return Vec::new();
    }
    if config.is_degenerate() {
        log::warn!(
            "non-positive page extent {}x{} (fill_ratio={}); one sentence per page",
            config.page_width,
            config.page_height,
            config.fill_ratio
        );
        return paginate_degenerate(texts, config, measurer);
    }

    let threshold = config.height_threshold();
    let mut pages = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut height_used = 0.0f64;

    for (index, text) in texts.iter().enumerate() {
        let text = text.as_ref();
        if text.trim().is_empty() {
            if current.is_empty() {
                log::trace!("skipping leading blank paragraph {}", index);
            } else {
                current.push(index);
                height_used += config.blank_paragraph_height;
            }
            continue;
        }

        let height = measure_paragraph(text, config, measurer);
        if height_used + height > threshold && !current.is_empty() {
            flush(&mut pages, &mut current, &mut height_used);
        }
        if height > threshold {
            split_paragraph(index, text, config, measurer, &mut pages);
            continue;
        }
        current.push(index);
        height_used += height;
    }
    flush(&mut pages, &mut current, &mut height_used);

    log::debug!(
        "paginated {} paragraphs into {} pages ({}x{})",
        texts.len(),
        pages.len(),
        config.page_width,
        config.page_height
    );
    pages
}

fn measure_paragraph<M>(text: &str, config: &PaginationConfig, measurer: &M) -> f64
where
    M: TextMeasurer + ?Sized,
{
    let direction = TextDirection::detect(text);
    let height = measurer.measure_height(
        text,
        &config.text_style,
        config.available_width(),
        direction,
    );
    sanitize_height(height) + config.paragraph_padding
}

fn sanitize_height(height: f64) -> f64 {
    if height.is_finite() && height > 0.0 {
        height
    } else {
        0.0
    }
}

fn flush(pages: &mut Vec<Page>, current: &mut Vec<usize>, height_used: &mut f64) {
    if current.is_empty() {
        return;
    }
    pages.push(Page {
        paragraph_indexes: core::mem::take(current),
        estimated_height: *height_used,
        fragment: None,
    });
    *height_used = 0.0;
}

/// Every paragraph overflows a zero-size page, so each sentence becomes its
/// own chunk. No word fallback: a paragraph without sentence breaks stays a
/// single chunk.
fn paginate_degenerate<T, M>(texts: &[T], config: &PaginationConfig, measurer: &M) -> Vec<Page>
where
    T: AsRef<str>,
    M: TextMeasurer + ?Sized,
{
    let mut pages: Vec<Page> = Vec::new();
    for (index, text) in texts.iter().enumerate() {
        let text = text.as_ref();
        if text.trim().is_empty() {
            match pages.last_mut() {
                Some(page) if !page.is_fragment() => {
                    page.paragraph_indexes.push(index);
                    page.estimated_height += config.blank_paragraph_height;
                }
                _ => log::trace!("dropping blank paragraph {} on zero-size page", index),
            }
            continue;
        }
        let chunks = sentence_ranges(text)
            .into_iter()
            .map(|range| {
                let height = measure_paragraph(text[range.clone()].trim(), config, measurer);
                (range, height)
            })
            .collect();
        push_chunks(index, text, chunks, &mut pages);
    }
    pages
}

/// Emit one page per chunk of an oversized paragraph.
///
/// Chunks cover the whole text without gaps. A single word wider than a page
/// still becomes its own over-height chunk.
fn split_paragraph<M>(
    index: usize,
    text: &str,
    config: &PaginationConfig,
    measurer: &M,
    pages: &mut Vec<Page>,
) where
    M: TextMeasurer + ?Sized,
{
    let threshold = config.height_threshold();
    let measure = |range: &Range<usize>| measure_paragraph(text[range.clone()].trim(), config, measurer);

    let mut segments: Vec<Range<usize>> = Vec::new();
    for sentence in sentence_ranges(text) {
        if measure(&sentence) > threshold {
            log::trace!(
                "paragraph {}: sentence {:?} exceeds page, splitting on words",
                index,
                sentence
            );
            segments.extend(word_ranges(text, sentence));
        } else {
            segments.push(sentence);
        }
    }

    let mut chunks: Vec<(Range<usize>, f64)> = Vec::new();
    let mut chunk: Option<(Range<usize>, f64)> = None;
    for segment in segments {
        chunk = match chunk {
            None => {
                let height = measure(&segment);
                Some((segment, height))
            }
            Some((range, height)) => {
                let candidate = range.start..segment.end;
                let candidate_height = measure(&candidate);
                if candidate_height > threshold {
                    chunks.push((range, height));
                    let height = measure(&segment);
                    Some((segment, height))
                } else {
                    Some((candidate, candidate_height))
                }
            }
        };
    }
    chunks.extend(chunk);

    push_chunks(index, text, chunks, pages);
}

/// One single-paragraph page per chunk; a lone chunk shows the whole paragraph.
fn push_chunks(index: usize, text: &str, chunks: Vec<(Range<usize>, f64)>, pages: &mut Vec<Page>) {
    log::debug!(
        "split paragraph {} ({} bytes) into {} chunks",
        index,
        text.len(),
        chunks.len()
    );
    let whole = chunks.len() == 1;
    pages.extend(chunks.into_iter().map(|(range, height)| Page {
        paragraph_indexes: vec![index],
        estimated_height: height,
        fragment: (!whole).then_some(range),
    }));
}

fn is_sentence_terminator(ch: char) -> bool {
    // Latin, Arabic question mark, Urdu full stop.
    matches!(ch, '.' | '!' | '?' | '\u{061F}' | '\u{06D4}')
}

/// Sentence byte ranges covering `text`; trailing whitespace stays with its sentence.
pub(crate) fn sentence_ranges(text: &str) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        let followed_by_space = chars.peek().is_some_and(|(_, next)| next.is_whitespace());
        if !(is_sentence_terminator(ch) && followed_by_space) {
            continue;
        }
        let mut end = idx + ch.len_utf8();
        while let Some(&(next_idx, next)) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            end = next_idx + next.len_utf8();
            chars.next();
        }
        out.push(start..end);
        start = end;
    }
    if start < text.len() {
        out.push(start..text.len());
    }
    out
}

/// Word byte ranges covering `range`; whitespace stays with the preceding word.
pub(crate) fn word_ranges(text: &str, range: Range<usize>) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = range.start;
    let mut seen_word = false;
    let mut after_space = false;
    for (offset, ch) in text[range.clone()].char_indices() {
        if ch.is_whitespace() {
            after_space = true;
            continue;
        }
        let at = range.start + offset;
        if seen_word && after_space {
            out.push(start..at);
            start = at;
        }
        seen_word = true;
        after_space = false;
    }
    if start < range.end {
        out.push(start..range.end);
    }
    out
}
