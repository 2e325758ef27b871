use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coach::types::FeedMessage;
use crate::services::feed::{Feed, FeedError};
use crate::services::sink::{Sink, SinkError};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Deserialize)]
struct UpdatesEnvelope {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    #[serde(default)]
    date: i64,
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Bot API client acting as both the inbound feed and the outbound sink
#[derive(Clone)]
pub struct TelegramClient {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.config.bot_token.is_some() && self.config.chat_id.is_some()
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.config.chat_id.as_deref()
    }

    fn method_url(&self, token: &str, method: &str) -> String {
        format!("{}/bot{token}/{method}", self.config.api_base.trim_end_matches('/'))
    }
}

/// Updates without a text message still carry an id so the watermark can pass them.
fn into_feed_messages(updates: Vec<Update>) -> Vec<FeedMessage> {
    updates
        .into_iter()
        .map(|update| match update.message {
            Some(message) => FeedMessage {
                id: update.update_id,
                timestamp: message.date,
                origin_id: message.chat.id.to_string(),
                text: message.text.unwrap_or_default(),
            },
            None => FeedMessage {
                id: update.update_id,
                timestamp: 0,
                origin_id: String::new(),
                text: String::new(),
            },
        })
        .collect()
}

fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

impl Feed for TelegramClient {
    async fn fetch(&self, watermark: i64) -> Result<Vec<FeedMessage>, FeedError> {
        let token = self
            .config
            .bot_token
            .as_deref()
            .ok_or(FeedError::NotConfigured("TG_BOT_TOKEN"))?;

        let resp = self
            .client
            .get(self.method_url(token, "getUpdates"))
            .query(&updates_query(watermark))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::HttpStatus { status, body });
        }

        let envelope: UpdatesEnvelope = resp.json().await?;
        if !envelope.ok {
            return Err(FeedError::Api(envelope.description.unwrap_or_default()));
        }
        debug!(updates = envelope.result.len(), "updates fetched");
        Ok(into_feed_messages(envelope.result))
    }
}

/// `offset` confirms everything up to the watermark, so the 100-update
/// window always starts at unseen messages
fn updates_query(watermark: i64) -> Vec<(&'static str, i64)> {
    if watermark > 0 {
        vec![("offset", watermark + 1)]
    } else {
        Vec::new()
    }
}

impl Sink for TelegramClient {
    async fn send(&self, text: &str) -> Result<(), SinkError> {
        let token = self
            .config
            .bot_token
            .as_deref()
            .ok_or(SinkError::NotConfigured("TG_BOT_TOKEN"))?;
        let chat_id = self
            .config
            .chat_id
            .as_deref()
            .ok_or(SinkError::NotConfigured("TG_CHAT_ID"))?;
        let url = self.method_url(token, "sendMessage");

        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            let payload = SendMessagePayload { chat_id, text: &chunk };
            let resp = self.client.post(&url).json(&payload).send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(SinkError::HttpStatus { status, body });
            }
        }
        Ok(())
    }
}
