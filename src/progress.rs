//! Progress-callback trait for per-page events in batch runs.
//!
//! Inject an [`Arc<dyn NormalizeProgressCallback>`] via
//! [`crate::config::NormalizerConfigBuilder::progress_callback`] to hear
//! about each page as [`crate::Normalizer::normalize_files`] works through
//! a batch.
//!
//! # Example
//!
//! ```rust
//! use manuscript_normalizer::{NormalizeProgressCallback, NormalizerConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct GapCounter {
//!     gaps: AtomicUsize,
//! }
//!
//! impl NormalizeProgressCallback for GapCounter {
//!     fn on_page_complete(&self, _page_num: usize, _total: usize, _lines: usize, gaps: usize) {
//!         self.gaps.fetch_add(gaps, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(GapCounter { gaps: AtomicUsize::new(0) });
//! let config = NormalizerConfig::builder()
//!     .progress_callback(counter as Arc<dyn NormalizeProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch entry point as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Pages are processed one at a time, but the trait
/// is `Send + Sync` so a callback can be shared with other threads.
pub trait NormalizeProgressCallback: Send + Sync {
    /// Called once before the first page.
    fn on_batch_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page is read.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed position in the batch
    /// * `total_pages` — pages in the batch
    /// * `source`      — label of the page, usually its file name
    fn on_page_start(&self, page_num: usize, total_pages: usize, source: &str) {
        let _ = (page_num, total_pages, source);
    }

    /// Called when a page was normalized.
    ///
    /// # Arguments
    /// * `lines` — lines kept after region filtering
    /// * `gaps`  — unresolved glyphs on the page
    fn on_page_complete(&self, page_num: usize, total_pages: usize, lines: usize, gaps: usize) {
        let _ = (page_num, total_pages, lines, gaps);
    }

    /// Called when a page was discarded.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page was attempted.
    fn on_batch_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl NormalizeProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::NormalizerConfig`].
pub type ProgressCallback = Arc<dyn NormalizeProgressCallback>;
