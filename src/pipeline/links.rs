//! Link normalisation: free-form message text to ordered candidate URLs.
//!
//! Any non-empty comma/newline separated token is a candidate; nothing is
//! validated or deduplicated here so that every token the user typed gets
//! exactly one line in the report. Cloud-storage "view" links are rewritten
//! to their direct-export form because the view page is HTML, never the file.

use crate::config::CloudStorageConfig;
use crate::error::PdfJoinError;
use crate::output::LinkRequest;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use tracing::debug;

/// `.../file/d/<ID>/view...`
static VIEW_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/file/d/([A-Za-z0-9_-]+)/view").unwrap());

/// Split `text` into trimmed, non-empty tokens, in order.
pub fn split_candidates(text: &str) -> Vec<&str> {
    text.split([',', '\n', '\r'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Rewrite a cloud-storage "view" URL to a direct download; pass others through.
///
/// Only links on a configured provider host are rewritten. The same path
/// shape on any other host is left alone.
pub fn normalize_link(link: &str, cloud: &CloudStorageConfig) -> String {
    let Ok(url) = Url::parse(link) else {
        return link.to_string();
    };
    if !url.host_str().is_some_and(|host| cloud.matches_host(host)) {
        return link.to_string();
    }
    match VIEW_URL.captures(url.path()) {
        Some(caps) => {
            let rewritten = cloud.export_url(&caps[1]);
            debug!("Rewrote view link {} -> {}", link, rewritten);
            rewritten
        }
        None => link.to_string(),
    }
}

/// Extract the ordered candidate links from one message.
///
/// # Errors
/// [`PdfJoinError::EmptyInput`] when the message has no candidates; the
/// caller should prompt the user instead of starting a batch.
pub fn extract_links(text: &str, cloud: &CloudStorageConfig) -> Result<LinkRequest, PdfJoinError> {
    let links: Vec<String> = split_candidates(text)
        .into_iter()
        .map(|token| normalize_link(token, cloud))
        .collect();

    if links.is_empty() {
        return Err(PdfJoinError::EmptyInput);
    }
    Ok(LinkRequest::new(links))
}
