//! Page lookup and cached pagination keyed by layout profile.

use crate::measure::TextMeasurer;
use crate::paginate::{paginate_texts, Page, PaginationConfig};

/// Stable identifier for a pagination-affecting configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PaginationProfileId(pub [u8; 32]);

impl PaginationProfileId {
    /// Build a deterministic profile id from arbitrary payload bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        fn fnv64(seed: u64, payload: &[u8]) -> u64 {
            let mut hash = seed;
            for b in payload {
                hash ^= *b as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            hash
        }
        let mut out = [0u8; 32];
        let seeds = [
            0xcbf29ce484222325,
            0x9e3779b97f4a7c15,
            0xd6e8feb86659fd93,
            0xa0761d6478bd642f,
        ];
        for (chunk, seed) in out.chunks_exact_mut(8).zip(seeds) {
            chunk.copy_from_slice(&fnv64(seed, bytes).to_le_bytes());
        }
        Self(out)
    }

    /// Profile of every config field that changes page breaks.
    pub fn from_config(config: &PaginationConfig) -> Self {
        let mut payload = Vec::with_capacity(64);
        for value in [
            config.page_width,
            config.page_height,
            config.horizontal_inset,
            config.paragraph_padding,
            config.blank_paragraph_height,
            config.fill_ratio,
        ] {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        payload.extend_from_slice(&config.text_style.font_size_px.to_le_bytes());
        payload.extend_from_slice(&config.text_style.line_height.to_le_bytes());
        Self::from_bytes(&payload)
    }
}

/// Index of the page showing `paragraph_index`.
///
/// Split paragraphs resolve to their first chunk. Paragraphs that appear on
/// no page (skipped leading blanks) resolve to the nearest earlier page, or
/// the first page when none precedes them. `None` only for an empty page list.
pub fn page_index_for_paragraph(pages: &[Page], paragraph_index: usize) -> Option<usize> {
    if pages.is_empty() {
        return None;
    }
    let after = pages.partition_point(|page| {
        page.first_paragraph()
            .is_some_and(|first| first <= paragraph_index)
    });
    let Some(candidate) = after.checked_sub(1) else {
        return Some(0);
    };
    // Walk back over trailing fragments of the same paragraph.
    let mut idx = candidate;
    while idx > 0 && pages[idx - 1].first_paragraph() == pages[idx].first_paragraph() {
        idx -= 1;
    }
    if pages[idx].contains_paragraph(paragraph_index) {
        Some(idx)
    } else {
        Some(candidate)
    }
}

/// Keep the reader on the same paragraph across a re-pagination.
pub fn remap_page_index(old_pages: &[Page], old_page_index: usize, new_pages: &[Page]) -> Option<usize> {
    let paragraph = old_pages.get(old_page_index)?.first_paragraph()?;
    page_index_for_paragraph(new_pages, paragraph)
}

/// Last pagination result plus the profile it was built with.
///
/// The cache key covers the layout settings and the byte length of every
/// paragraph. An edit that keeps every length unchanged still needs
/// [`PageCache::invalidate`].
#[derive(Clone, Debug, Default)]
pub struct PageCache {
    profile: Option<PaginationProfileId>,
    content: Option<PaginationProfileId>,
    pages: Vec<Page>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached pages, empty before the first pass.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn profile(&self) -> Option<PaginationProfileId> {
        self.profile
    }

    /// Whether cached pages were built for `config` and paragraphs shaped like `texts`.
    pub fn is_current<T: AsRef<str>>(&self, config: &PaginationConfig, texts: &[T]) -> bool {
        self.profile == Some(PaginationProfileId::from_config(config))
            && self.content == Some(content_key(texts))
    }

    /// Cached pages, re-paginating when the layout or paragraph lengths changed.
    pub fn get_or_paginate<T, M>(
        &mut self,
        texts: &[T],
        config: &PaginationConfig,
        measurer: &M,
    ) -> &[Page]
    where
        T: AsRef<str>,
        M: TextMeasurer + ?Sized,
    {
        let profile = PaginationProfileId::from_config(config);
        let content = content_key(texts);
        if self.profile == Some(profile) && self.content == Some(content) {
            log::trace!("page cache hit ({} pages)", self.pages.len());
            return &self.pages;
        }
        log::debug!("page cache miss; paginating {} paragraphs", texts.len());
        self.pages = paginate_texts(texts, config, measurer);
        self.profile = Some(profile);
        self.content = Some(content);
        &self.pages
    }

    /// Drop cached pages so the next call re-paginates.
    pub fn invalidate(&mut self) {
        self.profile = None;
        self.content = None;
        self.pages.clear();
    }
}

/// Paragraph count followed by each paragraph's byte length.
fn content_key<T: AsRef<str>>(texts: &[T]) -> PaginationProfileId {
    let mut payload = Vec::with_capacity((texts.len() + 1) * 8);
    payload.extend_from_slice(&(texts.len() as u64).to_le_bytes());
    for text in texts {
        payload.extend_from_slice(&(text.as_ref().len() as u64).to_le_bytes());
    }
    PaginationProfileId::from_bytes(&payload)
}
