//! Bulk memory copy used to fill pooled buffers.
//!
//! - [`ParallelCopy`] - Chunked copy fanned out onto a rayon thread pool
//! - [`chunk_ranges`] - The chunk split, exposed for inspection and testing
//! - [`CopySummary`] - Bytes and chunks of a finished copy

mod parallel;

pub use parallel::{CopySummary, ParallelCopy, chunk_ranges};
