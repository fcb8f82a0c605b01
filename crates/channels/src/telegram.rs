//! Telegram channel adapter: long polling plus message sending via the Bot API.
//!
//! ```text
//! POST {api}/bot<token>/getUpdates   {"offset": last+1, "timeout": 30, "allowed_updates": ["message"]}
//! POST {api}/bot<token>/sendMessage  {"chat_id": ..., "text": ...}
//! ```
//!
//! Polling runs on a spawned task and feeds a bounded queue; the consumer
//! reads it through [`Channel::start`]. Transient API failures are logged
//! and retried after a short pause.

use async_trait::async_trait;
use docbot_config::TelegramConfig;
use docbot_core::channel::{Channel, ChannelId, ChannelMessage};
use docbot_core::error::ChannelError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const RETRY_DELAY: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Telegram channel adapter.
pub struct TelegramChannel {
    api: BotApi,
    allowed_users: Vec<String>,
    poll_timeout_secs: u64,
    channel_id: ChannelId,
    shutdown: tokio::sync::Mutex<Option<watch::Sender<bool>>>,
}

impl TelegramChannel {
    pub fn new(bot_token: impl Into<String>, allowed_users: Vec<String>) -> Self {
        Self {
            api: BotApi {
                client: reqwest::Client::new(),
                base: DEFAULT_API_BASE.into(),
                token: bot_token.into(),
            },
            allowed_users,
            poll_timeout_secs: 30,
            channel_id: ChannelId("telegram".into()),
            shutdown: tokio::sync::Mutex::new(None),
        }
    }

    /// Build from configuration. Fails when no bot token is set.
    pub fn from_config(config: &TelegramConfig) -> Result<Self, ChannelError> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ChannelError::NotConfigured("BOT_TOKEN is not set".into()))?;
        Ok(Self::new(token, config.allowed_users.clone())
            .with_poll_timeout(config.poll_timeout_secs))
    }

    /// Point at a different Bot API server.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api.base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_timeout(mut self, secs: u64) -> Self {
        self.poll_timeout_secs = secs;
        self
    }

    /// The bot account behind the token.
    pub async fn get_me(&self) -> Result<TelegramUser, ChannelError> {
        self.api.call("getMe", &serde_json::json!({}), REQUEST_TIMEOUT).await
    }

    async fn send_chunk(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id_value(chat_id),
            "text": text,
        });
        if let Some(id) = reply_to.and_then(|r| r.parse::<i64>().ok()) {
            body["reply_to_message_id"] = id.into();
        }
        let _: serde_json::Value = self.api.call("sendMessage", &body, REQUEST_TIMEOUT).await?;
        Ok(())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn id(&self) -> &ChannelId {
        &self.channel_id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(64);
        let (stop_tx, stop_rx) = watch::channel(false);
        *self.shutdown.lock().await = Some(stop_tx);

        info!(poll_timeout = self.poll_timeout_secs, "Telegram channel starting");
        tokio::spawn(poll_loop(
            self.api.clone(),
            self.poll_timeout_secs,
            tx,
            stop_rx,
        ));
        Ok(rx)
    }

    async fn send(
        &self,
        chat_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<(), ChannelError> {
        if content.trim().is_empty() {
            return Err(ChannelError::InvalidPayload("empty message text".into()));
        }
        let parts = split_message(content, MAX_MESSAGE_CHARS);
        debug!(chat_id, parts = parts.len(), "Telegram send");
        for (i, part) in parts.iter().enumerate() {
            // Only the first part is threaded under the question.
            let reply = if i == 0 { reply_to } else { None };
            self.send_chunk(chat_id, part, reply).await?;
        }
        Ok(())
    }

    async fn send_typing(&self, chat_id: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "chat_id": chat_id_value(chat_id),
            "action": "typing",
        });
        let _: serde_json::Value = self
            .api
            .call("sendChatAction", &body, REQUEST_TIMEOUT)
            .await?;
        Ok(())
    }

    fn is_allowed(&self, sender_id: &str) -> bool {
        if self.allowed_users.is_empty() {
            return false;
        }
        if self.allowed_users.iter().any(|u| u == "*") {
            return true;
        }
        self.allowed_users.iter().any(|u| u == sender_id)
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        info!("Telegram channel stopping");
        if let Some(stop) = self.shutdown.lock().await.take() {
            let _ = stop.send(true);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        let me = self.get_me().await?;
        debug!(bot = me.username.as_deref().unwrap_or("unknown"), "Telegram getMe ok");
        Ok(me.is_bot)
    }
}

async fn poll_loop(
    api: BotApi,
    poll_timeout_secs: u64,
    tx: mpsc::Sender<Result<ChannelMessage, ChannelError>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut offset: i64 = 0;
    info!("Telegram polling loop started");

    loop {
        let polled = tokio::select! {
            _ = shutdown.changed() => break,
            polled = api.get_updates(offset, poll_timeout_secs) => polled,
        };

        match polled {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let Some(msg) = update.into_channel_message() else {
                        continue;
                    };
                    if tx.send(Ok(msg)).await.is_err() {
                        info!("Telegram polling stopped (receiver dropped)");
                        return;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Telegram polling error");
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => {}
                }
            }
        }
    }

    info!("Telegram polling loop stopped");
}

/// Split `text` into pieces of at most `max_chars` characters, preferring
/// to cut after a newline.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut parts = Vec::new();
    let mut rest = text;

    loop {
        let Some((limit, _)) = rest.char_indices().nth(max_chars) else {
            parts.push(rest.to_string());
            return parts;
        };
        let cut = rest[..limit]
            .rfind('\n')
            .filter(|&i| i > 0)
            .map(|i| i + 1)
            .unwrap_or(limit);
        parts.push(rest[..cut].to_string());
        rest = &rest[cut..];
        if rest.is_empty() {
            return parts;
        }
    }
}

/// Parse a bot command: `/start@docbot arg` → `("start", "arg")`.
pub fn parse_command(text: &str) -> Option<(String, &str)> {
    let rest = text.trim_start().strip_prefix('/')?;
    let (head, args) = rest
        .split_once(char::is_whitespace)
        .unwrap_or((rest, ""));
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() {
        return None;
    }
    Some((name.to_lowercase(), args.trim()))
}

/// Numeric chat ids go out as integers, `@channel` names as strings.
fn chat_id_value(chat_id: &str) -> serde_json::Value {
    match chat_id.parse::<i64>() {
        Ok(id) => id.into(),
        Err(_) => chat_id.into(),
    }
}

#[derive(Clone)]
struct BotApi {
    client: reqwest::Client,
    base: String,
    token: String,
}

impl BotApi {
    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<T, ChannelError> {
        let response = self
            .client
            .post(self.url(method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionLost(format!("Telegram {method} failed: {}", e.without_url())))?;

        let status = response.status();
        let body: TelegramApiResponse<T> = response.json().await.map_err(|e| {
            ChannelError::InvalidPayload(format!("Invalid Telegram {method} response ({status}): {e}"))
        })?;

        if !body.ok {
            let reason = body.description.unwrap_or_else(|| status.to_string());
            warn!(method, %status, reason = %reason, "Telegram API error");
            return Err(ChannelError::DeliveryFailed {
                channel: "telegram".into(),
                reason,
            });
        }
        body.result
            .ok_or_else(|| ChannelError::InvalidPayload(format!("Telegram {method}: no result")))
    }

    async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<TelegramUpdate>, ChannelError> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        self.call(
            "getUpdates",
            &body,
            Duration::from_secs(timeout_secs) + REQUEST_TIMEOUT,
        )
        .await
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
struct TelegramApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
}

impl TelegramUpdate {
    /// Convert to a [`ChannelMessage`]. Non-text updates and messages from
    /// bots yield `None`.
    pub fn into_channel_message(self) -> Option<ChannelMessage> {
        let msg = self.message?;
        let text = msg.text?;
        let from = msg.from?;
        if from.is_bot {
            return None;
        }

        let mut metadata = serde_json::Map::new();
        metadata.insert("update_id".into(), self.update_id.into());
        metadata.insert("chat_type".into(), msg.chat.chat_type.into());
        metadata.insert("first_name".into(), from.first_name.into());
        if let Some((command, args)) = parse_command(&text) {
            metadata.insert("command".into(), command.into());
            metadata.insert("command_args".into(), args.into());
        }

        Some(ChannelMessage {
            channel_id: ChannelId("telegram".into()),
            sender_id: from.id.to_string(),
            sender_name: from.username,
            content: text,
            chat_id: msg.chat.id.to_string(),
            message_id: Some(msg.message_id.to_string()),
            metadata,
        })
    }
}
