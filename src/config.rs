//! Configuration types for fetching and merging PDF links.
//!
//! All batch behaviour is controlled through [`MergeConfig`], built via its
//! [`MergeConfigBuilder`]. Chat-transport credentials live separately in
//! [`BotConfig`] so the pipeline never sees a token it does not need.
//!
//! Both values are constructed once (usually by the binary, from CLI flags and
//! environment variables) and passed down explicitly. Nothing in the library
//! reads process-wide state at call time.

use crate::error::PdfJoinError;
use crate::progress::FetchProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default filename used when the merged artifact is delivered.
pub const DEFAULT_OUTPUT_FILENAME: &str = "merged.pdf";

/// Media type of the merged artifact.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Configuration for one batch: fetch, merge, deliver.
///
/// Built via [`MergeConfig::builder()`] or using [`MergeConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfjoin::MergeConfig;
///
/// let config = MergeConfig::builder()
///     .concurrency(4)
///     .download_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Clone)]
pub struct MergeConfig {
    /// Maximum number of downloads in flight for one batch. Default: 8.
    ///
    /// Every link in a batch is dispatched without waiting for earlier ones,
    /// but at most `concurrency` requests are open at once. A message with
    /// hundreds of links therefore cannot exhaust sockets or memory.
    pub concurrency: usize,

    /// Per-request download timeout in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Largest response body accepted for a single link. Default: 100 MiB.
    pub max_download_bytes: u64,

    /// `User-Agent` header sent with every download.
    pub user_agent: String,

    /// Hosts that use the cloud-storage retrieval strategy.
    pub cloud_storage: CloudStorageConfig,

    /// Filename of the delivered artifact. Default: `merged.pdf`.
    pub output_filename: String,

    /// Compress content streams of the merged document. Default: false.
    pub compress_output: bool,

    /// Optional per-link progress events.
    pub progress_callback: Option<Arc<dyn FetchProgressCallback>>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            download_timeout_secs: 120,
            max_download_bytes: 100 * 1024 * 1024,
            user_agent: format!("edgequake-pdfjoin/{}", env!("CARGO_PKG_VERSION")),
            cloud_storage: CloudStorageConfig::default(),
            output_filename: DEFAULT_OUTPUT_FILENAME.to_string(),
            compress_output: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for MergeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeConfig")
            .field("concurrency", &self.concurrency)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("max_download_bytes", &self.max_download_bytes)
            .field("user_agent", &self.user_agent)
            .field("cloud_storage", &self.cloud_storage)
            .field("output_filename", &self.output_filename)
            .field("compress_output", &self.compress_output)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn FetchProgressCallback>"),
            )
            .finish()
    }
}

impl MergeConfig {
    /// Create a new builder for `MergeConfig`.
    pub fn builder() -> MergeConfigBuilder {
        MergeConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`MergeConfig`].
#[derive(Debug)]
pub struct MergeConfigBuilder {
    config: MergeConfig,
}

impl MergeConfigBuilder {
    /// Downloads in flight per batch; clamped to at least 1.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_download_bytes(mut self, bytes: u64) -> Self {
        self.config.max_download_bytes = bytes;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn cloud_storage(mut self, cloud: CloudStorageConfig) -> Self {
        self.config.cloud_storage = cloud;
        self
    }

    pub fn output_filename(mut self, name: impl Into<String>) -> Self {
        self.config.output_filename = name.into();
        self
    }

    pub fn compress_output(mut self, v: bool) -> Self {
        self.config.compress_output = v;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn FetchProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<MergeConfig, PdfJoinError> {
        let c = &self.config;
        if c.download_timeout_secs == 0 {
            return Err(PdfJoinError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_download_bytes == 0 {
            return Err(PdfJoinError::InvalidConfig(
                "Download size limit must be > 0".into(),
            ));
        }
        if !c.output_filename.to_ascii_lowercase().ends_with(".pdf")
            || c.output_filename.contains(['/', '\\'])
        {
            return Err(PdfJoinError::InvalidConfig(format!(
                "Output filename must be a bare *.pdf name, got '{}'",
                c.output_filename
            )));
        }
        if c.cloud_storage.hosts.is_empty() {
            return Err(PdfJoinError::InvalidConfig(
                "At least one cloud-storage host is required".into(),
            ));
        }
        Ok(self.config)
    }
}

/// The large-file hosting provider that needs the confirmation flow.
///
/// `hosts` decides which URLs take the cloud-storage strategy;
/// `download_base` is the scheme + authority that rewritten "view" links
/// point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudStorageConfig {
    /// Lower-case host names, compared without port.
    pub hosts: Vec<String>,
    /// Base of the direct-export URL, without trailing slash.
    pub download_base: String,
}

impl Default for CloudStorageConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["drive.google.com".into(), "docs.google.com".into()],
            download_base: "https://drive.google.com".into(),
        }
    }
}

impl CloudStorageConfig {
    /// Does `host` belong to the provider?
    pub fn matches_host(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    /// Direct-export URL for a file identifier.
    pub fn export_url(&self, file_id: &str) -> String {
        format!(
            "{}/uc?export=download&id={}",
            self.download_base.trim_end_matches('/'),
            file_id
        )
    }
}

/// Credentials and endpoint for the Telegram Bot API transport.
#[derive(Clone)]
pub struct BotConfig {
    /// Bot token issued by BotFather.
    pub token: String,
    /// API root, overridable for self-hosted Bot API servers and tests.
    pub api_base: String,
    /// Long-poll timeout passed to `getUpdates`. Default: 30.
    pub poll_timeout_secs: u64,
}

impl BotConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: "https://api.telegram.org".into(),
            poll_timeout_secs: 30,
        }
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn poll_timeout_secs(mut self, secs: u64) -> Self {
        self.poll_timeout_secs = secs;
        self
    }

    /// Full URL of a Bot API method.
    pub fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base.trim_end_matches('/'),
            self.token,
            method
        )
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}
