//! Error types for the edgequake-pdfjoin library.
//!
//! Three distinct error types reflect three distinct failure scopes:
//!
//! * [`PdfJoinError`] — **Batch-level**: the batch cannot produce a merged
//!   artifact (no links in the message, every link failed, the merge or the
//!   delivery broke). Returned as `Err(PdfJoinError)` from the top-level
//!   functions and mapped to a generic user-facing notice by the reporter.
//!
//! * [`FetchError`] — **Per-link**: one link could not be retrieved as a PDF
//!   (wrong content type, transport error, unknown interstitial page). Stored
//!   inside [`crate::output::FetchOutcome`] so sibling links keep going and
//!   the report can list exactly which links failed.
//!
//! * [`MergeError`] — a fetched buffer could not be loaded or its pages could
//!   not be copied. Fatal to the batch's artifact; the detail is logged for
//!   operators and never shown to the end user.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All batch-level errors returned by the edgequake-pdfjoin library.
///
/// Link-level failures use [`FetchError`] and are stored in
/// [`crate::output::FetchOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PdfJoinError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The message contained no candidate links after normalisation.
    #[error("No links found in the message.\nSend one or more PDF links separated by commas or new lines.")]
    EmptyInput,

    // ── Batch errors ──────────────────────────────────────────────────────
    /// Every link in the batch failed; there is nothing to merge.
    #[error("All {total} links failed; no valid PDFs to merge")]
    AllFailed { total: usize },

    /// The merge of successfully fetched documents failed.
    #[error("Merge failed: {0}")]
    MergeFailed(#[from] MergeError),

    /// The merged document could not be handed to the chat transport.
    #[error("Failed to deliver merged document: {reason}")]
    DeliveryFailed { reason: String },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The chat transport returned an error outside a document delivery.
    #[error("Chat transport error: {0}")]
    Transport(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single link.
///
/// The `Display` text is the failure reason recorded in the outcome and
/// written to the operator log.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FetchError {
    /// The candidate is not an absolute HTTP/HTTPS URL.
    #[error("invalid URL: {detail}")]
    InvalidUrl { detail: String },

    /// Direct download returned a content type without "pdf".
    #[error("link does not point to a PDF file (content type: {content_type})")]
    NotAPdf { content_type: String },

    /// Cloud-storage download finished without a `.pdf` filename hint.
    #[error("download did not provide a PDF file (content disposition: {disposition})")]
    MissingPdfDisposition { disposition: String },

    /// The cloud-storage provider returned a page we could not interpret.
    #[error("unknown provider format: no confirmation token found on the download page")]
    UnrecognizedInterstitial,

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}")]
    HttpStatus { status: u16 },

    /// The request exceeded the configured download timeout.
    #[error("download timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The response body is larger than the configured cap.
    #[error("response exceeds the {limit} byte download limit")]
    TooLarge { limit: u64 },

    /// DNS, connect, TLS or body read failure.
    #[error("transport error: {reason}")]
    Transport { reason: String },
}

impl FetchError {
    /// Normalise a `reqwest` error into a single failure value.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            FetchError::Timeout { secs: timeout_secs }
        } else if let Some(status) = err.status() {
            FetchError::HttpStatus {
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                reason: err.to_string(),
            }
        }
    }
}

/// Failure while loading or concatenating fetched documents.
#[derive(Debug, Clone, Error)]
pub enum MergeError {
    /// The merger was called with nothing to merge.
    #[error("no documents to merge")]
    NoDocuments,

    /// A source buffer could not be parsed as a PDF.
    #[error("document {index} could not be loaded: {detail}")]
    Load { index: usize, detail: String },

    /// Copying pages from a source into the destination failed.
    #[error("pages of document {index} could not be copied: {detail}")]
    CopyPages { index: usize, detail: String },

    /// Serialising the destination document failed.
    #[error("merged document could not be written: {detail}")]
    Save { detail: String },

    /// The blocking merge task panicked or was cancelled.
    #[error("merge task aborted: {detail}")]
    Aborted { detail: String },
}
