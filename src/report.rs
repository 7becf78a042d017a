//! Outcome reporting: run one chat message as a batch and tell the user.
//!
//! ## Message order
//!
//! ```text
//! "Processing N link(s)…"      (acknowledgement, before any fetch)
//! failed-link listing          (only if some link failed; may span messages)
//! "No valid PDFs…"             (zero successes; merge skipped)
//!   or merged document upload  (delivery)
//!   or generic error notice    (merge or delivery failed)
//! summary                      (always last, exactly once)
//! ```
//!
//! The acknowledgement is the only message that may precede the failed-link
//! listing. Users see link text and counts only. Failure reasons, merge errors and
//! delivery errors go to the `tracing` log, never into the chat.

use crate::config::PDF_MIME_TYPE;
use crate::error::PdfJoinError;
use crate::join::PdfJoiner;
use crate::output::{BatchReport, BatchStatus, BatchSummary, MergedDocument};
use crate::pipeline::{batch, merge};
use crate::transport::{ChatId, ChatTransport, InboundMessage};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{error, info, warn};

/// Reply to `/start`, `/help` and messages without links.
pub const USAGE: &str = "Send me one or more PDF links, separated by commas or new lines, \
and I will merge them into a single PDF in the order you sent them.";

pub const NO_VALID_PDFS: &str = "No valid PDFs were found, so there is nothing to merge.";

pub const PROCESSING_ERROR: &str = "An error occurred while processing the PDFs. Please try again.";

pub const DELIVERY_ERROR: &str = "The merged PDF could not be sent. Please try again.";

/// Longest text sent as one chat message. Telegram rejects more than 4096.
pub const MAX_MESSAGE_CHARS: usize = 4000;

const FAILED_LINKS_HEADER: &str = "These links could not be processed:";

/// Listing of failed links, split into messages of at most
/// [`MAX_MESSAGE_CHARS`] characters. Empty when every link succeeded.
pub fn failed_links_messages(report: &BatchReport) -> Vec<String> {
    if report.failed_links.is_empty() {
        return Vec::new();
    }

    let mut messages = Vec::new();
    let mut current = String::from(FAILED_LINKS_HEADER);
    let mut len = current.chars().count();
    for link in &report.failed_links {
        let line = truncate_chars(&format!("- {link}"), MAX_MESSAGE_CHARS);
        let line_len = line.chars().count();
        if len + 1 + line_len > MAX_MESSAGE_CHARS {
            messages.push(std::mem::take(&mut current));
            len = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            len += 1;
        }
        current.push_str(&line);
        len += line_len;
    }
    messages.push(current);
    messages
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max - 1).collect();
    cut.push('\u{2026}');
    cut
}

/// Final message of every batch; worded after the branch the batch took.
pub fn summary_message(report: &BatchReport, status: BatchStatus) -> String {
    let failed = report.failure_count;
    match status {
        BatchStatus::Delivered => format!(
            "Done: {} PDF(s) merged, {} link(s) failed.",
            report.success_count, failed
        ),
        BatchStatus::AllFailed => format!("Done: no PDFs retrieved, {failed} link(s) failed."),
        BatchStatus::MergeFailed | BatchStatus::DeliveryFailed => format!(
            "Done: {} PDF(s) retrieved but no merged PDF was delivered, {} link(s) failed.",
            report.success_count, failed
        ),
    }
}

/// Process one inbound message end to end, reporting through `transport`.
///
/// # Returns
/// `Ok(BatchSummary)` once a batch ran, whichever way it ended; the
/// summary's `status` tells which.
///
/// # Errors
/// [`PdfJoinError::EmptyInput`] when the message had no links. The usage
/// prompt has already been sent and no fetch was made.
pub async fn process_message(
    joiner: &PdfJoiner,
    transport: &dyn ChatTransport,
    message: &InboundMessage,
) -> Result<BatchSummary, PdfJoinError> {
    let start = Instant::now();
    let chat_id = message.chat_id;

    let request = match joiner.parse(&message.text) {
        Ok(request) => request,
        Err(e) => {
            notify(transport, chat_id, USAGE).await;
            return Err(e);
        }
    };

    info!("Chat {}: batch of {} links", chat_id, request.len());
    notify(
        transport,
        chat_id,
        &format!("Processing {} link(s)…", request.len()),
    )
    .await;

    let outcomes = joiner.fetch_all(&request).await;
    let report = BatchReport::from_outcomes(&outcomes);

    for listing in failed_links_messages(&report) {
        notify(transport, chat_id, &listing).await;
    }

    let (status, merged_pages) = if report.success_count == 0 {
        notify(transport, chat_id, NO_VALID_PDFS).await;
        (BatchStatus::AllFailed, None)
    } else {
        let buffers = batch::into_buffers(outcomes);
        match merge::merge_pdfs(buffers, joiner.config().compress_output).await {
            Err(e) => {
                error!("Chat {}: merge failed: {}", chat_id, e);
                notify(transport, chat_id, PROCESSING_ERROR).await;
                (BatchStatus::MergeFailed, None)
            }
            Ok(document) => {
                let filename = &joiner.config().output_filename;
                match deliver(transport, chat_id, &document, filename).await {
                    Ok(()) => (BatchStatus::Delivered, Some(document.page_count)),
                    Err(e) => {
                        error!("Chat {}: {}", chat_id, e);
                        notify(transport, chat_id, DELIVERY_ERROR).await;
                        (BatchStatus::DeliveryFailed, None)
                    }
                }
            }
        }
    };

    notify(transport, chat_id, &summary_message(&report, status)).await;

    let summary = BatchSummary {
        status,
        report,
        merged_pages,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Chat {}: {:?}, {}/{} links ok, {}ms",
        chat_id,
        summary.status,
        summary.report.success_count,
        summary.report.total(),
        summary.duration_ms
    );
    Ok(summary)
}

/// Write `document` to a scratch directory, upload it, and remove it.
///
/// The `TempDir` guard deletes the file on every return path, including a
/// failed write or upload and unwinding.
pub async fn deliver(
    transport: &dyn ChatTransport,
    chat_id: ChatId,
    document: &MergedDocument,
    filename: &str,
) -> Result<(), PdfJoinError> {
    let scratch = TempDir::new().map_err(|e| PdfJoinError::DeliveryFailed {
        reason: format!("temp dir: {e}"),
    })?;
    let path = scratch.path().join(filename);

    tokio::fs::write(&path, &document.bytes)
        .await
        .map_err(|e| PdfJoinError::DeliveryFailed {
            reason: format!("write {}: {e}", path.display()),
        })?;

    transport
        .send_document(chat_id, &path, filename, PDF_MIME_TYPE)
        .await
        .map_err(|reason| PdfJoinError::DeliveryFailed { reason })
}

/// Send a status message; a failed send is logged and does not stop the batch.
async fn notify(transport: &dyn ChatTransport, chat_id: ChatId, text: &str) {
    if let Err(e) = transport.send_text(chat_id, text).await {
        warn!("Chat {}: failed to send message: {}", chat_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use httpmock::prelude::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        texts: Mutex<Vec<String>>,
        documents: Mutex<Vec<(PathBuf, Vec<u8>)>>,
        fail_upload: bool,
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send_text(&self, _chat_id: ChatId, text: &str) -> Result<(), String> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn send_document(
            &self,
            _chat_id: ChatId,
            path: &Path,
            _filename: &str,
            mime_type: &str,
        ) -> Result<(), String> {
            assert_eq!(mime_type, "application/pdf");
            let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
            self.documents
                .lock()
                .unwrap()
                .push((path.to_path_buf(), bytes));
            if self.fail_upload {
                Err("upload rejected".into())
            } else {
                Ok(())
            }
        }
    }

    fn message(text: &str) -> InboundMessage {
        InboundMessage {
            chat_id: 42,
            text: text.into(),
        }
    }

    fn report(success_count: usize, failed_links: Vec<String>) -> BatchReport {
        BatchReport {
            success_count,
            failure_count: failed_links.len(),
            failed_links,
        }
    }

    #[test]
    fn failed_listing_shows_links_only() {
        let listing =
            failed_links_messages(&report(1, vec!["https://a/x".into(), "https://b/y".into()]));
        assert_eq!(
            listing,
            ["These links could not be processed:\n- https://a/x\n- https://b/y"]
        );
        assert!(failed_links_messages(&report(1, vec![])).is_empty());
    }

    #[test]
    fn long_listing_is_split_under_message_limit() {
        let links: Vec<String> = (0..200)
            .map(|i| format!("https://example.com/{i:03}/{}", "x".repeat(80)))
            .collect();
        let oversized = format!("https://example.com/{}", "y".repeat(5000));
        let mut failed = links.clone();
        failed.push(oversized);

        let listing = failed_links_messages(&report(0, failed));

        assert!(listing.len() > 1);
        assert!(listing[0].starts_with("These links could not be processed:"));
        assert!(listing
            .iter()
            .all(|m| m.chars().count() <= MAX_MESSAGE_CHARS));

        let lines: Vec<&str> = listing
            .iter()
            .flat_map(|m| m.lines())
            .filter(|l| l.starts_with("- "))
            .collect();
        assert_eq!(lines.len(), 201);
        for (line, link) in lines.iter().zip(&links) {
            assert_eq!(line.strip_prefix("- "), Some(link.as_str()));
        }
        assert!(lines[200].ends_with('\u{2026}'));
    }

    #[test]
    fn summary_wording_follows_branch() {
        let r = report(2, vec!["bad".into()]);
        assert_eq!(
            summary_message(&r, BatchStatus::Delivered),
            "Done: 2 PDF(s) merged, 1 link(s) failed."
        );
        for status in [BatchStatus::MergeFailed, BatchStatus::DeliveryFailed] {
            let msg = summary_message(&r, status);
            assert!(!msg.contains("merged,"), "got: {msg}");
            assert!(msg.contains("2 PDF(s) retrieved"), "got: {msg}");
        }
        assert_eq!(
            summary_message(&report(0, vec!["bad".into()]), BatchStatus::AllFailed),
            "Done: no PDFs retrieved, 1 link(s) failed."
        );
    }

    #[tokio::test]
    async fn empty_message_prompts_and_stops() {
        let joiner = PdfJoiner::new(Default::default()).unwrap();
        let transport = RecordingTransport::default();

        let err = process_message(&joiner, &transport, &message(" , \n"))
            .await
            .unwrap_err();

        assert!(matches!(err, PdfJoinError::EmptyInput));
        assert_eq!(*transport.texts.lock().unwrap(), vec![USAGE.to_string()]);
        assert!(transport.documents.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn all_failed_lists_links_and_ends_with_summary() {
        let joiner = PdfJoiner::new(Default::default()).unwrap();
        let transport = RecordingTransport::default();

        let summary = process_message(&joiner, &transport, &message("bad-1, bad-2\nbad-3"))
            .await
            .unwrap();

        assert_eq!(summary.status, BatchStatus::AllFailed);
        assert_eq!(summary.report.success_count, 0);
        assert_eq!(summary.report.failed_links, ["bad-1", "bad-2", "bad-3"]);
        assert!(summary.merged_pages.is_none());

        let texts = transport.texts.lock().unwrap();
        assert_eq!(texts.len(), 4);
        assert!(texts[0].starts_with("Processing 3"));
        assert!(texts[1].contains("- bad-1\n- bad-2\n- bad-3"));
        assert_eq!(texts[2], NO_VALID_PDFS);
        assert_eq!(texts[3], "Done: no PDFs retrieved, 3 link(s) failed.");
        assert!(transport.documents.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivered_file_is_removed_after_upload() {
        let transport = RecordingTransport::default();
        let document = merge::merge_documents(
            &[merge::tests::labelled_pdf(&["A"])],
            false,
        )
        .unwrap();

        deliver(&transport, 1, &document, "merged.pdf").await.unwrap();

        let documents = transport.documents.lock().unwrap();
        let (path, bytes) = &documents[0];
        assert_eq!(bytes, &document.bytes);
        assert!(path.ends_with("merged.pdf"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn failed_upload_still_removes_file() {
        let transport = RecordingTransport {
            fail_upload: true,
            ..Default::default()
        };
        let document = merge::merge_documents(
            &[merge::tests::labelled_pdf(&["A"])],
            false,
        )
        .unwrap();

        let err = deliver(&transport, 1, &document, "merged.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, PdfJoinError::DeliveryFailed { .. }));
        let documents = transport.documents.lock().unwrap();
        assert!(!documents[0].0.exists());
    }

    #[tokio::test]
    async fn unmergeable_pdf_sends_notice_then_summary() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken.pdf");
                then.status(200)
                    .header("content-type", "application/pdf")
                    .body("<html>oops</html>");
            })
            .await;
        let joiner = PdfJoiner::new(Default::default()).unwrap();
        let transport = RecordingTransport::default();

        let summary = process_message(&joiner, &transport, &message(&server.url("/broken.pdf")))
            .await
            .unwrap();

        assert_eq!(summary.status, BatchStatus::MergeFailed);
        assert_eq!(summary.report.success_count, 1);
        assert!(summary.merged_pages.is_none());
        assert!(transport.documents.lock().unwrap().is_empty());

        let texts = transport.texts.lock().unwrap();
        assert_eq!(texts.len(), 3);
        assert!(texts[0].starts_with("Processing 1"));
        assert_eq!(texts[1], PROCESSING_ERROR);
        assert_eq!(
            texts[2],
            summary_message(&summary.report, BatchStatus::MergeFailed)
        );
    }

    #[tokio::test]
    async fn rejected_upload_sends_notice_then_summary() {
        let server = MockServer::start_async().await;
        let body = merge::tests::labelled_pdf(&["A", "B"]);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/a.pdf");
                then.status(200)
                    .header("content-type", "application/pdf")
                    .body(body);
            })
            .await;
        let joiner = PdfJoiner::new(Default::default()).unwrap();
        let transport = RecordingTransport {
            fail_upload: true,
            ..Default::default()
        };

        let summary = process_message(&joiner, &transport, &message(&server.url("/a.pdf")))
            .await
            .unwrap();

        assert_eq!(summary.status, BatchStatus::DeliveryFailed);
        assert!(summary.merged_pages.is_none());

        let documents = transport.documents.lock().unwrap();
        assert_eq!(documents.len(), 1);
        assert!(!documents[0].0.exists());

        let texts = transport.texts.lock().unwrap();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[1], DELIVERY_ERROR);
        assert_eq!(
            texts[2],
            "Done: 1 PDF(s) retrieved but no merged PDF was delivered, 0 link(s) failed."
        );
    }
}
