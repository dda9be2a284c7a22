//! Error types for reflow addressing.
//!
//! Only precondition violations and out-of-range generation requests are
//! errors. Malformed or unresolvable CFIs and unmatched highlights are not:
//! those APIs return `None` or skip the item.

use core::fmt;

/// Errors raised by boundary construction and CFI generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReflowError {
    /// A boundary table was built for a document with no chapters.
    EmptyBoundaries,
    /// The first chapter boundary was not `0`.
    FirstBoundaryNotZero(usize),
    /// A chapter boundary was smaller than the one before it.
    DecreasingBoundary {
        chapter_index: usize,
        previous: usize,
        value: usize,
    },
    /// Chapter index outside the loaded document.
    ChapterOutOfBounds { index: usize, chapter_count: usize },
    /// Flat paragraph index outside the loaded document.
    ParagraphOutOfBounds { index: usize, paragraph_count: usize },
    /// A flat paragraph index that belongs to a different chapter.
    ParagraphNotInChapter { index: usize, chapter_index: usize },
    /// The element handed to CFI generation is not part of the chapter markup.
    ElementNotInChapter { chapter_index: usize },
    /// Text that does not follow the CFI grammar, from `str::parse`.
    MalformedCfi(String),
}

impl fmt::Display for ReflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBoundaries => {
                write!(f, "invalid state: chapter boundary table is empty")
            }
            Self::FirstBoundaryNotZero(value) => {
                write!(f, "invalid state: first chapter boundary is {} (expected 0)", value)
            }
            Self::DecreasingBoundary {
                chapter_index,
                previous,
                value,
            } => write!(
                f,
                "invalid state: chapter {} starts at {} before previous boundary {}",
                chapter_index, value, previous
            ),
            Self::ChapterOutOfBounds {
                index,
                chapter_count,
            } => write!(
                f,
                "chapter index {} out of bounds (chapter_count={})",
                index, chapter_count
            ),
            Self::ParagraphOutOfBounds {
                index,
                paragraph_count,
            } => write!(
                f,
                "paragraph index {} out of bounds (paragraph_count={})",
                index, paragraph_count
            ),
            Self::ParagraphNotInChapter {
                index,
                chapter_index,
            } => write!(
                f,
                "paragraph {} is not part of chapter {}",
                index, chapter_index
            ),
            Self::ElementNotInChapter { chapter_index } => {
                write!(f, "element is not part of chapter {}", chapter_index)
            }
            Self::MalformedCfi(input) => write!(f, "malformed CFI: {}", input),
        }
    }
}

impl std::error::Error for ReflowError {}
