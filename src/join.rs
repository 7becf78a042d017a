//! Library entry points: text in, merged PDF out.
//!
//! [`PdfJoiner`] owns the pieces a batch needs (configuration and a pooled
//! HTTP client) so a long-running bot builds them once and reuses them for
//! every message. [`join`] is the one-call convenience for scripts.
//!
//! These functions return batch-level failures as `Err`. The chat-facing
//! flow that turns those into user messages lives in [`crate::report`].

use crate::config::MergeConfig;
use crate::error::PdfJoinError;
use crate::output::{BatchReport, FetchOutcome, JoinOutput, LinkRequest};
use crate::pipeline::{batch, fetch::Fetcher, links, merge};
use std::time::Instant;
use tracing::info;

/// Reusable fetch-and-merge pipeline.
#[derive(Debug, Clone)]
pub struct PdfJoiner {
    fetcher: Fetcher,
    config: MergeConfig,
}

impl PdfJoiner {
    pub fn new(config: MergeConfig) -> Result<Self, PdfJoinError> {
        let fetcher = Fetcher::new(&config)?;
        Ok(Self { fetcher, config })
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Normalise the links in `text`.
    pub fn parse(&self, text: &str) -> Result<LinkRequest, PdfJoinError> {
        links::extract_links(text, &self.config.cloud_storage)
    }

    /// Fetch every link; one outcome per link, in link order.
    pub async fn fetch_all(&self, request: &LinkRequest) -> Vec<FetchOutcome> {
        batch::retrieve_all(&self.fetcher, request, &self.config).await
    }

    /// Fetch and merge all links found in `text`.
    ///
    /// # Errors
    /// - [`PdfJoinError::EmptyInput`] — no links in `text`
    /// - [`PdfJoinError::AllFailed`] — no link produced a PDF
    /// - [`PdfJoinError::MergeFailed`] — a fetched PDF could not be merged
    pub async fn join(&self, text: &str) -> Result<JoinOutput, PdfJoinError> {
        let start = Instant::now();
        let request = self.parse(text)?;
        let outcomes = self.fetch_all(&request).await;
        let report = BatchReport::from_outcomes(&outcomes);

        if report.success_count == 0 {
            return Err(PdfJoinError::AllFailed {
                total: report.total(),
            });
        }

        let buffers = batch::into_buffers(outcomes);
        let document = merge::merge_pdfs(buffers, self.config.compress_output).await?;
        info!(
            "Joined {}/{} links into {} pages in {}ms",
            report.success_count,
            report.total(),
            document.page_count,
            start.elapsed().as_millis()
        );

        Ok(JoinOutput { document, report })
    }
}

/// Fetch and merge all links found in `text` with a one-off [`PdfJoiner`].
pub async fn join(text: impl AsRef<str>, config: &MergeConfig) -> Result<JoinOutput, PdfJoinError> {
    PdfJoiner::new(config.clone())?.join(text.as_ref()).await
}
