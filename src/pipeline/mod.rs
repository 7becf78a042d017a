//! Pipeline stages for fetch-and-merge.
//!
//! Each submodule implements one step and is tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! links ──▶ batch ──▶ fetch (×n) ──▶ merge
//! (text)    (fan-out)  (HTTP)        (lopdf)
//! ```
//!
//! 1. [`links`] — split a message into candidate links and rewrite
//!    cloud-storage viewer URLs to direct-export URLs
//! 2. [`batch`] — dispatch every link at once with bounded concurrency and
//!    restore link order afterwards
//! 3. [`fetch`] — retrieve one link, choosing the direct or cloud-storage
//!    strategy by host; the only stage with network I/O
//! 4. [`merge`] — concatenate pages in order; runs in `spawn_blocking`
//!    because object renumbering is CPU-bound

pub mod batch;
pub mod fetch;
pub mod links;
pub mod merge;
