//! Telegram Bot API adapter.
//!
//! ## Why long polling?
//!
//! `getUpdates` needs no public endpoint or TLS certificate, so the bot runs
//! the same on a laptop as on a server. The offset is advanced past every
//! update we receive, which acknowledges it; a crash re-delivers at most
//! the last unacknowledged page of updates.

use super::{ChatId, ChatTransport, InboundMessage};
use crate::config::BotConfig;
use crate::error::PdfJoinError;
use crate::join::PdfJoiner;
use crate::report::{process_message, USAGE};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Slack on top of the long-poll timeout before the HTTP client gives up.
const CLIENT_TIMEOUT_MARGIN_SECS: u64 = 30;

/// Pause after a failed `getUpdates` call.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: ChatId,
}

#[derive(Debug, Deserialize)]
struct User {
    username: Option<String>,
}

// ── Transport ────────────────────────────────────────────────────────────────

/// [`ChatTransport`] over the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramTransport {
    client: reqwest::Client,
    bot: BotConfig,
}

impl TelegramTransport {
    pub fn new(bot: BotConfig) -> Result<Self, PdfJoinError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                bot.poll_timeout_secs + CLIENT_TIMEOUT_MARGIN_SECS,
            ))
            .build()
            .map_err(|e| PdfJoinError::Transport(format!("HTTP client: {e}")))?;
        Ok(Self { client, bot })
    }

    /// Check the token; returns the bot's username.
    pub async fn get_me(&self) -> Result<String, PdfJoinError> {
        let resp = self
            .client
            .get(self.bot.method_url("getMe"))
            .send()
            .await
            .map_err(|e| PdfJoinError::Transport(format!("getMe: {e}")))?;
        let user: User = read_result("getMe", resp)
            .await
            .map_err(PdfJoinError::Transport)?;
        Ok(user.username.unwrap_or_default())
    }

    /// One long-poll round. Returns the text messages received and the
    /// offset for the next call.
    ///
    /// Updates without a text message (stickers, edits, joins) are
    /// acknowledged and dropped.
    pub async fn get_updates(
        &self,
        offset: i64,
    ) -> Result<(Vec<InboundMessage>, i64), PdfJoinError> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": self.bot.poll_timeout_secs,
            "allowed_updates": ["message"],
        });
        let resp = self
            .client
            .post(self.bot.method_url("getUpdates"))
            .json(&body)
            .send()
            .await
            .map_err(|e| PdfJoinError::Transport(format!("getUpdates: {e}")))?;
        let updates: Vec<Update> = read_result("getUpdates", resp)
            .await
            .map_err(PdfJoinError::Transport)?;

        let next = updates
            .iter()
            .map(|u| u.update_id + 1)
            .max()
            .unwrap_or(offset);
        let messages = updates
            .into_iter()
            .filter_map(|u| u.message)
            .filter_map(|m| {
                m.text.map(|text| InboundMessage {
                    chat_id: m.chat.id,
                    text,
                })
            })
            .collect();
        Ok((messages, next))
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), String> {
        let body = serde_json::json!({ "chat_id": chat_id, "text": text });
        let resp = self
            .client
            .post(self.bot.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("sendMessage: {e}"))?;
        read_result::<serde_json::Value>("sendMessage", resp).await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        filename: &str,
        mime_type: &str,
    ) -> Result<(), String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("read {}: {e}", path.display()))?;
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(|e| format!("mime type {mime_type}: {e}"))?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);

        let resp = self
            .client
            .post(self.bot.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("sendDocument: {e}"))?;
        read_result::<serde_json::Value>("sendDocument", resp).await?;
        debug!("Chat {}: uploaded {} ({} bytes)", chat_id, filename, size);
        Ok(())
    }
}

/// Unwrap the Bot API envelope. Telegram reports most errors as
/// `{"ok": false, "description": ...}`, often with a 4xx status.
async fn read_result<T: DeserializeOwned>(
    method: &str,
    resp: reqwest::Response,
) -> Result<T, String> {
    let status = resp.status();
    let envelope: ApiResponse<T> = resp
        .json()
        .await
        .map_err(|e| format!("{method}: HTTP {status}, unreadable response: {e}"))?;
    match (envelope.ok, envelope.result) {
        (true, Some(result)) => Ok(result),
        _ => Err(format!(
            "{method}: {}",
            envelope
                .description
                .unwrap_or_else(|| format!("HTTP {status}"))
        )),
    }
}

fn is_help_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or("");
    // "/start@my_bot" in group chats.
    let command = command.split('@').next().unwrap_or("");
    matches!(command, "/start" | "/help")
}

/// Poll for messages until the task is cancelled.
///
/// Every text message other than `/start` or `/help` is processed as a
/// batch in its own task, so a slow batch never delays polling or other
/// chats.
///
/// # Errors
/// Returns [`PdfJoinError::Transport`] only if the token is rejected at
/// startup. Later polling failures are logged and retried.
pub async fn run_polling(
    transport: Arc<TelegramTransport>,
    joiner: Arc<PdfJoiner>,
) -> Result<(), PdfJoinError> {
    let username = transport.get_me().await?;
    info!("Polling for updates as @{}", username);

    let mut offset = 0;
    loop {
        let messages = match transport.get_updates(offset).await {
            Ok((messages, next)) => {
                offset = next;
                messages
            }
            Err(e) => {
                warn!("{}; retrying in {}s", e, POLL_RETRY_DELAY.as_secs());
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        for message in messages {
            if is_help_command(&message.text) {
                if let Err(e) = transport.send_text(message.chat_id, USAGE).await {
                    warn!("Chat {}: failed to send usage: {}", message.chat_id, e);
                }
                continue;
            }

            let transport = Arc::clone(&transport);
            let joiner = Arc::clone(&joiner);
            tokio::spawn(async move {
                match process_message(&joiner, transport.as_ref(), &message).await {
                    Ok(_) => {}
                    Err(PdfJoinError::EmptyInput) => {
                        debug!("Chat {}: message had no links", message.chat_id)
                    }
                    Err(e) => error!("Chat {}: {}", message.chat_id, e),
                }
            });
        }
    }
}
