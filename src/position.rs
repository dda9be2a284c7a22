//! Conversion between flat paragraph positions and chapter coordinates.
//!
//! The host samples its viewport and calls into the resolver on demand; no
//! subscription state lives here.

use serde::{Deserialize, Serialize};

use crate::error::ReflowError;

/// Flat index at which each chapter's paragraphs begin.
///
/// Always non-empty, starts at `0`, and never decreases. Empty chapters share
/// a boundary with the chapter after them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChapterBoundaries(Vec<usize>);

impl ChapterBoundaries {
    /// Validate and wrap a boundary table.
    pub fn new(boundaries: Vec<usize>) -> Result<Self, ReflowError> {
        match boundaries.first() {
            None => return Err(ReflowError::EmptyBoundaries),
            Some(&first) if first != 0 => return Err(ReflowError::FirstBoundaryNotZero(first)),
            Some(_) => {}
        }
        for (idx, pair) in boundaries.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(ReflowError::DecreasingBoundary {
                    chapter_index: idx + 1,
                    previous: pair[0],
                    value: pair[1],
                });
            }
        }
        Ok(Self(boundaries))
    }

    /// Boundaries as a slice, one per chapter.
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Number of chapters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First flat index of `chapter_index`.
    pub fn start_of(&self, chapter_index: usize) -> Option<usize> {
        self.0.get(chapter_index).copied()
    }
}

/// Edge thresholds for the "mostly scrolled past" correction.
///
/// Tuned against one viewport implementation; other hosts may need their own.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeThresholds {
    /// Trailing edge of the reported item must be below this.
    pub trailing_max: f64,
    /// Leading edge of its successor must be below this.
    pub leading_max: f64,
}

impl Default for EdgeThresholds {
    fn default() -> Self {
        Self {
            trailing_max: 0.55,
            leading_max: -0.05,
        }
    }
}

/// Progress indicators for a flat position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadingProgress {
    /// Owning chapter.
    pub chapter_index: usize,
    /// Chapter-relative paragraph index.
    pub paragraph_index: usize,
    /// Progress through the chapter in `[0.0, 1.0]`.
    pub chapter_progress: f32,
    /// Progress through the book in `[0.0, 1.0]`.
    pub book_progress: f32,
}

/// Pure position functions over a captured boundary table.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionResolver {
    boundaries: ChapterBoundaries,
    thresholds: EdgeThresholds,
    paragraph_count: Option<usize>,
}

impl PositionResolver {
    pub fn new(boundaries: ChapterBoundaries) -> Self {
        Self {
            boundaries,
            thresholds: EdgeThresholds::default(),
            paragraph_count: None,
        }
    }

    /// Build straight from a raw table, failing on an invalid one.
    pub fn from_boundaries(boundaries: Vec<usize>) -> Result<Self, ReflowError> {
        ChapterBoundaries::new(boundaries).map(Self::new)
    }

    pub fn with_thresholds(mut self, thresholds: EdgeThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Record the total paragraph count, enabling bounds checks and progress.
    pub fn with_paragraph_count(mut self, paragraph_count: usize) -> Self {
        self.paragraph_count = Some(paragraph_count);
        self
    }

    pub fn boundaries(&self) -> &ChapterBoundaries {
        &self.boundaries
    }

    pub fn thresholds(&self) -> EdgeThresholds {
        self.thresholds
    }

    /// Correct a reported viewport position using item edge samples.
    ///
    /// When the reported item has mostly scrolled past (small trailing edge)
    /// while its successor has not meaningfully entered (negative leading
    /// edge), the successor is the current item. Both samples are required.
    pub fn absolute_index(
        &self,
        position: usize,
        trailing_edge: Option<f64>,
        leading_edge: Option<f64>,
    ) -> usize {
        match (trailing_edge, leading_edge) {
            (Some(trailing), Some(leading))
                if trailing < self.thresholds.trailing_max
                    && leading < self.thresholds.leading_max =>
            {
                log::trace!(
                    "edge correction: position {} -> {} (trailing={} leading={})",
                    position,
                    position.saturating_add(1),
                    trailing,
                    leading
                );
                position.saturating_add(1)
            }
            _ => position,
        }
    }

    /// Index of the last chapter whose boundary is `<= abs_position`.
    ///
    /// `None` only for a position before the first boundary, which a valid
    /// table (first boundary `0`) cannot produce.
    pub fn chapter_index_for(&self, abs_position: usize) -> Option<usize> {
        let after = self
            .boundaries
            .as_slice()
            .partition_point(|&start| start <= abs_position);
        after.checked_sub(1)
    }

    /// Chapter-relative paragraph index for `abs_position`.
    pub fn paragraph_index_for(&self, abs_position: usize) -> usize {
        match self
            .chapter_index_for(abs_position)
            .and_then(|chapter| self.boundaries.start_of(chapter))
        {
            Some(start) => abs_position - start,
            None => abs_position,
        }
    }

    /// Flat index of `paragraph_index` within `chapter_index`.
    ///
    /// Bounds are checked against the next chapter boundary, or against the
    /// paragraph count for the last chapter when it is known.
    pub fn absolute_position(&self, chapter_index: usize, paragraph_index: usize) -> Option<usize> {
        let start = self.boundaries.start_of(chapter_index)?;
        let end = self
            .boundaries
            .start_of(chapter_index + 1)
            .or(self.paragraph_count);
        let abs = start.checked_add(paragraph_index)?;
        match end {
            Some(end) if abs >= end => None,
            _ => Some(abs),
        }
    }

    /// Progress indicators for `abs_position`.
    ///
    /// Requires the paragraph count; `None` when unknown or out of range.
    pub fn progress(&self, abs_position: usize) -> Option<ReadingProgress> {
        let total = self.paragraph_count?;
        if abs_position >= total {
            return None;
        }
        let chapter_index = self.chapter_index_for(abs_position)?;
        let start = self.boundaries.start_of(chapter_index)?;
        let end = self
            .boundaries
            .start_of(chapter_index + 1)
            .unwrap_or(total);
        let paragraph_index = abs_position - start;
        Some(ReadingProgress {
            chapter_index,
            paragraph_index,
            chapter_progress: ratio(paragraph_index, end - start),
            book_progress: ratio(abs_position, total),
        })
    }
}

fn ratio(index: usize, count: usize) -> f32 {
    if count <= 1 {
        return 0.0;
    }
    (index as f32 / (count - 1) as f32).clamp(0.0, 1.0)
}
