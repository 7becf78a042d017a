//! Progress-callback trait for per-link fetch events.
//!
//! Inject an [`Arc<dyn FetchProgressCallback>`] via
//! [`crate::config::MergeConfigBuilder::progress_callback`] to receive
//! events as the batch retriever works through each link.
//!
//! # Why callbacks instead of channels?
//!
//! The callback is the least-invasive integration point: the CLI drives an
//! `indicatif` bar from it, a bot could edit a status message, tests count
//! events with atomics. The trait is `Send + Sync` because links are fetched
//! concurrently.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfjoin::{FetchProgressCallback, MergeConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     fetched: AtomicUsize,
//! }
//!
//! impl FetchProgressCallback for CountingCallback {
//!     fn on_link_complete(&self, index: usize, total: usize, bytes: usize) {
//!         self.fetched.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Link {}/{} done ({} bytes)", index + 1, total, bytes);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { fetched: AtomicUsize::new(0) });
//!
//! let config = MergeConfig::builder()
//!     .progress_callback(counter as Arc<dyn FetchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch retriever as it processes each link.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is the 0-based position of the link in the
/// batch, not its completion order.
///
/// # Thread safety
///
/// `on_link_start`, `on_link_complete` and `on_link_error` may be called
/// concurrently and in any order relative to `index`. Protect shared state
/// with `Mutex` or atomics.
pub trait FetchProgressCallback: Send + Sync {
    /// Called once before any link is fetched.
    fn on_batch_start(&self, total_links: usize) {
        let _ = total_links;
    }

    /// Called just before the request for a link is sent.
    fn on_link_start(&self, index: usize, total_links: usize, link: &str) {
        let _ = (index, total_links, link);
    }

    /// Called when a link was retrieved and classified as a PDF.
    fn on_link_complete(&self, index: usize, total_links: usize, bytes: usize) {
        let _ = (index, total_links, bytes);
    }

    /// Called when a link failed.
    fn on_link_error(&self, index: usize, total_links: usize, error: &str) {
        let _ = (index, total_links, error);
    }

    /// Called once after every link has settled.
    fn on_batch_complete(&self, total_links: usize, success_count: usize) {
        let _ = (total_links, success_count);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl FetchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::MergeConfig`].
pub type ProgressCallback = Arc<dyn FetchProgressCallback>;
