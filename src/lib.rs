//! # edgequake-pdfjoin
//!
//! Fetch PDFs from a list of links and merge them into one document, in the
//! order the links were given.
//!
//! ## Why this crate?
//!
//! People share PDFs as links: direct URLs, and cloud-storage viewer links
//! that hide the file behind an HTML page. Joining them means downloading
//! each by hand and running a desktop tool. This crate takes the raw text of
//! a message, fetches every link concurrently, keeps the ones that really
//! are PDFs, and produces a single merged file plus a report of what failed.
//!
//! ## Pipeline Overview
//!
//! ```text
//! message text
//!  │
//!  ├─ 1. Links    split on commas/newlines, rewrite viewer URLs
//!  ├─ 2. Fetch    concurrent downloads (direct or cloud-storage flow)
//!  ├─ 3. Report   per-link outcomes in link order, failed links listed
//!  ├─ 4. Merge    page concatenation via lopdf (spawn_blocking)
//!  └─ 5. Deliver  temp file → chat transport → cleanup
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfjoin::{join, MergeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let text = "https://example.com/a.pdf, https://example.com/b.pdf";
//!     let output = join(text, &MergeConfig::default()).await?;
//!     std::fs::write("merged.pdf", &output.document.bytes)?;
//!     eprintln!("{} merged, {} failed",
//!         output.report.success_count,
//!         output.report.failure_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Chat bots
//!
//! [`process_message`] runs one message through the whole flow and reports
//! back over any [`ChatTransport`]. [`TelegramTransport`] and
//! [`transport::telegram::run_polling`] turn it into a Telegram bot.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfjoin` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfjoin = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod join;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod transport;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BotConfig, CloudStorageConfig, MergeConfig, MergeConfigBuilder};
pub use error::{FetchError, MergeError, PdfJoinError};
pub use join::{join, PdfJoiner};
pub use output::{
    BatchReport, BatchStatus, BatchSummary, FetchOutcome, JoinOutput, LinkRequest, MergedDocument,
};
pub use progress::{FetchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::process_message;
pub use transport::{
    console::ConsoleTransport, telegram::TelegramTransport, ChatId, ChatTransport, InboundMessage,
};
