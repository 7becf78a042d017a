//! Data carried between pipeline stages and returned to callers.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};

/// Ordered candidate links extracted from one message.
///
/// Only the link normaliser constructs this; order is the order the links
/// appeared in the message and is kept all the way to the merged output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRequest {
    links: Vec<String>,
}

impl LinkRequest {
    pub(crate) fn new(links: Vec<String>) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Result of fetching one link.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// 0-based position of the link in its [`LinkRequest`].
    pub index: usize,
    /// The candidate URL, after normalisation.
    pub link: String,
    /// PDF bytes, or why the link failed.
    pub result: Result<Vec<u8>, FetchError>,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.result.as_ref().ok().map(Vec::as_slice)
    }

    /// Failure reason as shown in the operator log.
    pub fn reason(&self) -> Option<String> {
        self.result.as_ref().err().map(ToString::to_string)
    }
}

/// A successfully merged document.
#[derive(Debug, Clone)]
pub struct MergedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub source_count: usize,
}

/// Result of [`crate::join::join`]: the merged document and its report.
#[derive(Debug, Clone)]
pub struct JoinOutput {
    pub document: MergedDocument,
    pub report: BatchReport,
}

/// Derived counts and failed links of a batch.
///
/// Always computed from the outcome slice, never stored beside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub failed_links: Vec<String>,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: &[FetchOutcome]) -> Self {
        let failed_links: Vec<String> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.link.clone())
            .collect();
        Self {
            success_count: outcomes.len() - failed_links.len(),
            failure_count: failed_links.len(),
            failed_links,
        }
    }

    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }
}

/// Which way a batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// The merged document was delivered.
    Delivered,
    /// No link produced a PDF; merge skipped.
    AllFailed,
    /// Merging the fetched documents failed.
    MergeFailed,
    /// The merged document could not be delivered.
    DeliveryFailed,
}

/// What happened to one batch, returned by [`crate::report::process_message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub status: BatchStatus,
    #[serde(flatten)]
    pub report: BatchReport,
    /// Pages in the delivered document, when one was produced.
    pub merged_pages: Option<usize>,
    pub duration_ms: u64,
}
