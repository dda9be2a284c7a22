//! Height-based pagination for `epub-reflow` paragraph streams.
//!
//! Pages are built greedily from measured paragraph heights. Measurement is
//! delegated to a host-supplied [`TextMeasurer`], so the same pass works with
//! real font shaping or a cheap estimate such as [`MonospaceMeasurer`].

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

mod measure;
mod page_map;
mod paginate;

pub use measure::{MonospaceMeasurer, TextDirection, TextMeasurer, TextStyle};
pub use page_map::{page_index_for_paragraph, remap_page_index, PageCache, PaginationProfileId};
pub use paginate::{paginate, paginate_texts, Page, PaginationConfig};
