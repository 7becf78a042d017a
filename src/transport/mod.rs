//! Chat-transport boundary.
//!
//! The pipeline talks to the outside world only through [`ChatTransport`]:
//! plain status text, and one document upload per successful batch. Two
//! adapters ship with the crate:
//!
//! * [`telegram::TelegramTransport`] — Telegram Bot API over `reqwest`,
//!   with a long-polling loop in [`telegram::run_polling`].
//! * [`console::ConsoleTransport`] — prints messages to stderr and copies
//!   the delivered document to a local path; used by `pdfjoin merge`.

pub mod console;
pub mod telegram;

use async_trait::async_trait;
use std::path::Path;

/// Identifier of the conversation a message came from.
pub type ChatId = i64;

/// One text message received from a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub text: String,
}

/// Outbound side of a chat transport.
///
/// Errors are plain strings: the reporter logs them and shows the user a
/// generic notice, so no structure is needed beyond a readable reason.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a status or report message.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), String>;

    /// Upload the file at `path` as `filename` with media type `mime_type`.
    ///
    /// `path` is only valid for the duration of the call; the caller deletes
    /// it afterwards.
    async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        filename: &str,
        mime_type: &str,
    ) -> Result<(), String>;
}
