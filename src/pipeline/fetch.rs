//! Resource fetching: one candidate URL in, PDF bytes or a [`FetchError`] out.
//!
//! ## Two strategies
//!
//! * **Direct** — ordinary HTTP(S) hosts. One GET; the declared
//!   `Content-Type` must mention `pdf`.
//! * **Cloud storage** — the large-file host configured in
//!   [`CloudStorageConfig`]. Large or flagged files come back as an HTML
//!   interstitial carrying a one-time `confirm` token instead of the file.
//!   We scan the page for the token, re-request the same file id with the
//!   token appended and require a `.pdf` filename in `Content-Disposition`.
//!
//! A page without a recognisable token is reported as
//! [`FetchError::UnrecognizedInterstitial`]; the HTML is never passed on as
//! if it were the document.
//!
//! `fetch` never returns a `PdfJoinError`: every failure is a value the batch
//! retriever can store next to the link that caused it.

use crate::config::{CloudStorageConfig, MergeConfig};
use crate::error::{FetchError, PdfJoinError};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Response, Url};
use std::time::Duration;
use tracing::{debug, info, warn};

/// `confirm=<token>` in a link, or `name="confirm" value="<token>"` in a form.
static RE_CONFIRM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:confirm=|name="confirm"\s+value=")([0-9A-Za-z_-]+)"#).unwrap()
});
static RE_UUID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"name="uuid"\s+value="([0-9A-Za-z_-]+)""#).unwrap());
static RE_FILE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/d/([A-Za-z0-9_-]+)").unwrap());

/// Retrieval path chosen for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    CloudStorage,
}

/// Downloads single links. Cheap to share: holds a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout_secs: u64,
    max_bytes: u64,
    cloud: CloudStorageConfig,
}

impl Fetcher {
    /// Build a fetcher from the batch configuration.
    pub fn new(config: &MergeConfig) -> Result<Self, PdfJoinError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PdfJoinError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: config.download_timeout_secs,
            max_bytes: config.max_download_bytes,
            cloud: config.cloud_storage.clone(),
        })
    }

    /// Which strategy applies to `url`.
    pub fn strategy_for(&self, url: &Url) -> Strategy {
        match url.host_str() {
            Some(host) if self.cloud.matches_host(host) => Strategy::CloudStorage,
            _ => Strategy::Direct,
        }
    }

    /// Retrieve `link` and classify it as a PDF.
    pub async fn fetch(&self, link: &str) -> Result<Vec<u8>, FetchError> {
        let url = Url::parse(link).map_err(|e| FetchError::InvalidUrl {
            detail: format!("'{link}': {e}"),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                detail: format!("'{link}': only http and https links are supported"),
            });
        }

        let strategy = self.strategy_for(&url);
        debug!("Fetching {} ({:?})", link, strategy);
        let bytes = match strategy {
            Strategy::Direct => self.fetch_direct(url).await?,
            Strategy::CloudStorage => self.fetch_cloud_storage(url).await?,
        };
        info!("Fetched {} bytes from {}", bytes.len(), link);
        Ok(bytes)
    }

    async fn fetch_direct(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url).await?;

        let content_type = header_value(&response, CONTENT_TYPE);
        if !content_type.to_ascii_lowercase().contains("pdf") {
            return Err(FetchError::NotAPdf {
                content_type: display_header(content_type),
            });
        }

        self.read_body(response).await
    }

    async fn fetch_cloud_storage(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url.clone()).await?;
        let disposition = header_value(&response, CONTENT_DISPOSITION);

        // Small files skip the interstitial and arrive directly.
        if has_pdf_filename(&disposition) {
            return self.read_body(response).await;
        }
        // An attachment that is not a PDF: no point looking for a token.
        if !disposition.is_empty() {
            return Err(FetchError::MissingPdfDisposition {
                disposition: display_header(disposition),
            });
        }

        let page = self.read_body(response).await?;
        let page = String::from_utf8_lossy(&page);
        let Some(token) = find_confirm_token(&page) else {
            warn!("No confirmation token on interstitial page for {}", url);
            return Err(FetchError::UnrecognizedInterstitial);
        };

        let confirm_url = self.confirm_url(&url, &token, find_uuid(&page).as_deref());
        debug!("Confirming large-file download via {}", confirm_url);

        let response = self.get(confirm_url).await?;
        let disposition = header_value(&response, CONTENT_DISPOSITION);
        if !has_pdf_filename(&disposition) {
            return Err(FetchError::MissingPdfDisposition {
                disposition: display_header(disposition),
            });
        }

        self.read_body(response).await
    }

    /// The confirmed download URL for the file behind `url`.
    ///
    /// Uses the provider's export form when a file id can be recovered, else
    /// appends the token to the original URL.
    fn confirm_url(&self, url: &Url, token: &str, uuid: Option<&str>) -> Url {
        let mut confirm = file_id(url)
            .and_then(|id| Url::parse(&self.cloud.export_url(&id)).ok())
            .unwrap_or_else(|| url.clone());
        {
            let mut pairs = confirm.query_pairs_mut();
            pairs.append_pair("confirm", token);
            if let Some(uuid) = uuid {
                pairs.append_pair("uuid", uuid);
            }
        }
        confirm
    }

    async fn get(&self, url: Url) -> Result<Response, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Read the body chunk by chunk, refusing anything past `max_bytes`.
    async fn read_body(&self, mut response: Response) -> Result<Vec<u8>, FetchError> {
        let limit = self.max_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(FetchError::TooLarge { limit });
        }

        let mut body = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout_secs))?
        {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

/// Header as a string, empty when absent or not valid UTF-8.
fn header_value(response: &Response, name: HeaderName) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn display_header(value: String) -> String {
    if value.is_empty() {
        "none".to_string()
    } else {
        value
    }
}

/// Does a `Content-Disposition` value name a `.pdf` file?
pub fn has_pdf_filename(disposition: &str) -> bool {
    disposition.to_ascii_lowercase().contains(".pdf")
}

/// Confirmation token embedded in a provider interstitial page.
pub fn find_confirm_token(page: &str) -> Option<String> {
    RE_CONFIRM.captures(page).map(|c| c[1].to_string())
}

fn find_uuid(page: &str) -> Option<String> {
    RE_UUID.captures(page).map(|c| c[1].to_string())
}

/// File id from `?id=<ID>` or a `/d/<ID>` path segment.
pub fn file_id(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
        .or_else(|| RE_FILE_ID.captures(url.path()).map(|c| c[1].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> Fetcher {
        Fetcher::new(&MergeConfig::default()).unwrap()
    }

    #[test]
    fn strategy_selection_by_host() {
        let f = fetcher();
        let drive = Url::parse("https://drive.google.com/uc?export=download&id=abc").unwrap();
        let other = Url::parse("https://example.com/drive.google.com.pdf").unwrap();
        assert_eq!(f.strategy_for(&drive), Strategy::CloudStorage);
        assert_eq!(f.strategy_for(&other), Strategy::Direct);
    }

    #[test]
    fn finds_token_in_link_and_form() {
        let link_page = r#"<a id="uc-download-link" href="/uc?export=download&amp;confirm=Xy_9&amp;id=abc">Download anyway</a>"#;
        assert_eq!(find_confirm_token(link_page).as_deref(), Some("Xy_9"));

        let form_page = r#"<form id="download-form" action="https://drive.usercontent.google.com/download">
            <input type="hidden" name="id" value="abc">
            <input type="hidden" name="confirm" value="t">
            <input type="hidden" name="uuid" value="1f2e-33">
        </form>"#;
        assert_eq!(find_confirm_token(form_page).as_deref(), Some("t"));
        assert_eq!(find_uuid(form_page).as_deref(), Some("1f2e-33"));

        assert_eq!(find_confirm_token("<html>Sign in</html>"), None);
    }

    #[test]
    fn pdf_filename_hint() {
        assert!(has_pdf_filename(r#"attachment; filename="Report.PDF""#));
        assert!(!has_pdf_filename(r#"attachment; filename="report.docx""#));
        assert!(!has_pdf_filename(""));
    }

    #[test]
    fn file_id_from_query_or_path() {
        let q = Url::parse("https://drive.google.com/uc?export=download&id=abc").unwrap();
        let p = Url::parse("https://drive.google.com/file/d/xyz/edit").unwrap();
        let none = Url::parse("https://drive.google.com/drive/my-drive").unwrap();
        assert_eq!(file_id(&q).as_deref(), Some("abc"));
        assert_eq!(file_id(&p).as_deref(), Some("xyz"));
        assert_eq!(file_id(&none), None);
    }

    #[test]
    fn confirm_url_uses_export_form() {
        let f = fetcher();
        let url = Url::parse("https://drive.google.com/open?id=abc").unwrap();
        let confirm = f.confirm_url(&url, "tok", Some("u1"));
        assert_eq!(
            confirm.as_str(),
            "https://drive.google.com/uc?export=download&id=abc&confirm=tok&uuid=u1"
        );
    }

    #[tokio::test]
    async fn rejects_non_http_links_without_network() {
        let f = fetcher();
        assert!(matches!(
            f.fetch("not a url").await,
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            f.fetch("ftp://example.com/a.pdf").await,
            Err(FetchError::InvalidUrl { .. })
        ));
    }
}
