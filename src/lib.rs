//! Position addressing for reflowable EPUB text.
//!
//! `epub-reflow` consumes an already-parsed chapter tree and provides:
//!
//! - [`flatten`]: one ordered paragraph stream plus chapter boundaries
//! - [`PositionResolver`]: flat index <-> chapter/paragraph coordinates,
//!   including the viewport edge heuristic
//! - [`cfi`]: EPUB Canonical Fragment Identifier parsing, generation and
//!   resolution back to a paragraph
//! - [`highlight`]: stored highlight text mapped onto paragraph display spans
//!
//! Pagination lives in the companion `epub-reflow-paginate` crate.
//!
//! ```rust
//! use epub_reflow::{flatten, Chapter, Element};
//!
//! let chapters = vec![
//!     Chapter::new("ch1.xhtml").with_body(vec![
//!         Element::new("h1").with_text("One"),
//!         Element::new("p").with_id("p1").with_text("First paragraph."),
//!     ]),
//!     Chapter::new("ch2.xhtml").with_body(vec![Element::new("p").with_text("Second.")]),
//! ];
//! let doc = flatten(&chapters);
//! assert_eq!(doc.boundaries(), &[0, 2]);
//!
//! let resolver = doc.resolver().unwrap();
//! assert_eq!(resolver.chapter_index_for(2), Some(1));
//! assert_eq!(resolver.paragraph_index_for(2), 0);
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod book;
pub mod cfi;
pub mod error;
pub mod flatten;
pub mod highlight;
pub mod position;

pub use book::{BlockRole, Book, Chapter, Element, SpineItem};
pub use cfi::{Cfi, CfiCodec, CfiTarget, ChapterRef, PathStep};
pub use error::ReflowError;
pub use flatten::{flatten, FlatDocument, Paragraph};
pub use highlight::{render_spans, ColorValue, Highlight, HighlightId, HighlightIndex, Span};
pub use position::{ChapterBoundaries, EdgeThresholds, PositionResolver, ReadingProgress};
