//! Batch retrieval: fetch every link of a [`LinkRequest`] concurrently.
//!
//! All links are dispatched up front through `buffer_unordered`, which keeps
//! at most `concurrency` requests in flight. Outcomes come back in completion
//! order and are re-sorted by link index before returning, so a slow first
//! link never reorders the merged document.
//!
//! A failed fetch becomes a `FetchOutcome` holding the error; siblings are
//! never cancelled and there is no early return.

use crate::config::MergeConfig;
use crate::output::{FetchOutcome, LinkRequest};
use crate::pipeline::fetch::Fetcher;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{info, warn};

/// Fetch all links and return one outcome per link, in link order.
pub async fn retrieve_all(
    fetcher: &Fetcher,
    request: &LinkRequest,
    config: &MergeConfig,
) -> Vec<FetchOutcome> {
    let total = request.len();
    let start = Instant::now();
    info!(
        "Fetching {} links (concurrency {})",
        total, config.concurrency
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut outcomes: Vec<FetchOutcome> = stream::iter(
        request
            .links()
            .iter()
            .enumerate()
            .map(|(index, link)| {
                let progress = config.progress_callback.clone();
                async move {
                    if let Some(ref cb) = progress {
                        cb.on_link_start(index, total, link);
                    }
                    let result = fetcher.fetch(link).await;
                    match &result {
                        Ok(bytes) => {
                            if let Some(ref cb) = progress {
                                cb.on_link_complete(index, total, bytes.len());
                            }
                        }
                        Err(e) => {
                            warn!("Link {} ({}) failed: {}", index + 1, link, e);
                            if let Some(ref cb) = progress {
                                cb.on_link_error(index, total, &e.to_string());
                            }
                        }
                    }
                    FetchOutcome {
                        index,
                        link: link.clone(),
                        result,
                    }
                }
            })
            .collect::<Vec<_>>(),
    )
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;

    // Completion order is arbitrary; report order is link order.
    outcomes.sort_by_key(|o| o.index);

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    info!(
        "Fetched {}/{} links in {}ms",
        succeeded,
        total,
        start.elapsed().as_millis()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, succeeded);
    }

    outcomes
}

/// Successful buffers in link order, consuming the outcomes.
pub fn into_buffers(outcomes: Vec<FetchOutcome>) -> Vec<Vec<u8>> {
    outcomes.into_iter().filter_map(|o| o.result.ok()).collect()
}
