//! Local transport: status text to stderr, document copied to a file.

use super::{ChatId, ChatTransport};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Transport for one-shot CLI runs.
#[derive(Debug, Clone)]
pub struct ConsoleTransport {
    output: PathBuf,
    quiet: bool,
}

impl ConsoleTransport {
    /// Deliver documents to `output`.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            quiet: false,
        }
    }

    /// Suppress status text; the document is still written.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send_text(&self, _chat_id: ChatId, text: &str) -> Result<(), String> {
        if !self.quiet {
            eprintln!("{text}");
        }
        Ok(())
    }

    async fn send_document(
        &self,
        _chat_id: ChatId,
        path: &Path,
        filename: &str,
        _mime_type: &str,
    ) -> Result<(), String> {
        // Write next to the target and rename, so a failed copy never leaves
        // a truncated PDF behind.
        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("create {}: {e}", parent.display()))?;
        }
        let tmp = self.output.with_extension("pdf.tmp");
        tokio::fs::copy(path, &tmp)
            .await
            .map_err(|e| format!("write {}: {e}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.output)
            .await
            .map_err(|e| format!("rename to {}: {e}", self.output.display()))?;

        info!("Wrote {} to {}", filename, self.output.display());
        Ok(())
    }
}
