//! Telegram channel — long-polls the Bot API for messages and button presses.
//!
//! Menus are rendered as inline keyboards. Button presses arrive as
//! `callback_query` updates and are answered immediately; their response
//! replaces the message that carried the keyboard when possible.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, parse_command};
use crate::error::ChannelError;
use crate::funnel::MenuButton;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Public Bot API endpoint.
const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            api_base: DEFAULT_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the channel at a different Bot API server (local bot API, test stub).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }

    /// Send a text message with an optional inline keyboard.
    /// Splits long messages; the keyboard goes on the last chunk.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        menu: Option<&[MenuButton]>,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let keyboard = if i == last { menu } else { None };
            self.send_message_chunk(chat_id, chunk, keyboard).await?;
        }
        Ok(())
    }

    /// Send a single message chunk (≤4096 chars), Markdown-first with fallback.
    async fn send_message_chunk(
        &self,
        chat_id: &str,
        text: &str,
        menu: Option<&[MenuButton]>,
    ) -> Result<(), ChannelError> {
        let mut markdown_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown"
        });
        if let Some(menu) = menu {
            markdown_body["reply_markup"] = inline_keyboard(menu);
        }

        let markdown_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&markdown_body)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        if markdown_resp.status().is_success() {
            return Ok(());
        }

        let markdown_status = markdown_resp.status();
        tracing::warn!(
            status = ?markdown_status,
            "Telegram sendMessage with Markdown failed; retrying without parse_mode"
        );

        let mut plain_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(menu) = menu {
            plain_body["reply_markup"] = inline_keyboard(menu);
        }
        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(send_failed(format!(
                "sendMessage failed (markdown: {}, plain: {})",
                markdown_status, plain_err
            )));
        }

        Ok(())
    }

    /// Replace the text and keyboard of an existing message.
    async fn edit_message(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
        menu: Option<&[MenuButton]>,
    ) -> Result<(), ChannelError> {
        if text.len() > TELEGRAM_MAX_MESSAGE_LENGTH {
            return Err(edit_failed("text exceeds a single message".into()));
        }

        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "Markdown"
        });
        if let Some(menu) = menu {
            body["reply_markup"] = inline_keyboard(menu);
        }

        let resp = self
            .client
            .post(self.api_url("editMessageText"))
            .json(&body)
            .send()
            .await
            .map_err(|e| edit_failed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(edit_failed(format!("{status}: {err}")));
        }
        Ok(())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let updates_url = self.api_url("getUpdates");
        let answer_url = self.api_url("answerCallbackQuery");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&updates_url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    let description = data
                        .get("description")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("");
                    tracing::warn!(description, "Telegram getUpdates returned no result");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                };

                for update in results {
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    // Stop the client-side spinner regardless of what we do next.
                    if let Some(query_id) = update
                        .get("callback_query")
                        .and_then(|q| q.get("id"))
                        .and_then(Value::as_str)
                    {
                        let _ = client
                            .post(&answer_url)
                            .json(&serde_json::json!({ "callback_query_id": query_id }))
                            .send()
                            .await;
                    }

                    let Some(incoming) = parse_update(update, &allowed_users) else {
                        continue;
                    };

                    tracing::info!(
                        user_id = %incoming.user_id,
                        kind = ?incoming.kind,
                        "Telegram update received"
                    );

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| send_failed("No chat_id in message metadata".into()))?;
        let menu = response.menu.as_deref();

        if response.edit {
            if let Some(message_id) = msg.metadata.get("message_id").and_then(Value::as_i64) {
                match self
                    .edit_message(chat_id, message_id, &response.content, menu)
                    .await
                {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        tracing::warn!("Edit failed ({e}). Sending new message.");
                    }
                }
            }
        }

        self.send_message(chat_id, &response.content, menu).await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn send_failed(reason: String) -> ChannelError {
    ChannelError::SendFailed {
        name: "telegram".into(),
        reason,
    }
}

fn edit_failed(reason: String) -> ChannelError {
    ChannelError::EditFailed {
        name: "telegram".into(),
        reason,
    }
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Render menu buttons as an inline keyboard, one button per row.
fn inline_keyboard(menu: &[MenuButton]) -> Value {
    let rows: Vec<Value> = menu
        .iter()
        .map(|b| {
            serde_json::json!([{
                "text": b.label,
                "callback_data": b.action_id,
            }])
        })
        .collect();
    serde_json::json!({ "inline_keyboard": rows })
}

/// Turn one getUpdates entry into an incoming message.
///
/// Returns `None` for updates we do not handle (non-text messages, other
/// update types) and for senders outside the allowlist.
fn parse_update(update: &Value, allowed_users: &[String]) -> Option<IncomingMessage> {
    if let Some(query) = update.get("callback_query") {
        let data = query.get("data").and_then(Value::as_str)?;
        let from = query.get("from")?;
        let (user_id, username) = sender_identity(from, allowed_users)?;

        let message = query.get("message");
        let chat_id = message
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)
            .map(|id| id.to_string())
            .unwrap_or_else(|| user_id.clone());
        let message_id = message
            .and_then(|m| m.get("message_id"))
            .and_then(Value::as_i64);

        let mut incoming = IncomingMessage::menu_action("telegram", &user_id, data)
            .with_metadata(serde_json::json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "username": username,
            }));
        if let Some(name) = from.get("first_name").and_then(Value::as_str) {
            incoming = incoming.with_user_name(name);
        }
        return Some(incoming);
    }

    let message = update.get("message")?;
    let text = message.get("text").and_then(Value::as_str)?;
    let from = message.get("from")?;
    let (user_id, username) = sender_identity(from, allowed_users)?;

    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_default();

    let incoming = match parse_command(text) {
        Some(command) => IncomingMessage::command("telegram", &user_id, &command),
        None => IncomingMessage::new("telegram", &user_id, text),
    };
    let mut incoming = incoming.with_metadata(serde_json::json!({
        "chat_id": chat_id,
        "username": username,
    }));
    if let Some(name) = from.get("first_name").and_then(Value::as_str) {
        incoming = incoming.with_user_name(name);
    }
    Some(incoming)
}

/// Resolve `(user_id, username)` for a sender, or `None` if not allowed.
fn sender_identity(from: &Value, allowed_users: &[String]) -> Option<(String, String)> {
    let username = from
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let user_id = from.get("id").and_then(Value::as_i64).map(|id| id.to_string());

    let mut identities = vec![username.as_str()];
    if let Some(ref id) = user_id {
        identities.push(id.as_str());
    }
    if !check_user_allowed(allowed_users, identities) {
        tracing::warn!(
            "Telegram: ignoring update from unauthorized user: username={username}, user_id={}",
            user_id.as_deref().unwrap_or("unknown")
        );
        return None;
    }

    let user_id = user_id.unwrap_or_else(|| username.clone());
    Some((user_id, username))
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts on a char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut cut = max_len;
        while !remaining.is_char_boundary(cut) {
            cut -= 1;
        }

        let chunk = &remaining[..cut];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(cut);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { cut } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
