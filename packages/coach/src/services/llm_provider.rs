use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::services::content::{ContentError, ContentRequest, ContentService};
use crate::services::prompts;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const MAX_RETRIES: usize = 3;
const BASE_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("LLM not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
}

/// OpenAI-compatible chat-completions client used as the content service
#[derive(Clone)]
pub struct LLMProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LLMProvider {
    pub fn new(mut config: LLMConfig) -> Self {
        config.api_endpoint = normalize_endpoint(&config.api_endpoint);
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn is_available(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|v| !v.trim().is_empty())
            && !self.config.model.trim().is_empty()
            && !self.config.api_endpoint.trim().is_empty()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LLMError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(LLMError::NotConfigured("LLM_API_KEY"))?;

        let url = format!("{}/chat/completions", self.config.api_endpoint);
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false
        });

        self.post_with_retry(&url, api_key, &payload).await
    }

    pub async fn complete_with_system(&self, system: &str, user: &str) -> Result<String, LLMError> {
        let messages = [
            ChatMessage { role: "system".into(), content: system.into() },
            ChatMessage { role: "user".into(), content: user.into() },
        ];
        let response = self.chat(&messages).await?;
        response
            .first_content()
            .map(str::to_string)
            .ok_or(LLMError::EmptyChoices)
    }

    async fn post_with_retry(
        &self,
        url: &str,
        api_key: &str,
        payload: &serde_json::Value,
    ) -> Result<ChatResponse, LLMError> {
        let mut last_error = None;

        for retry in 0..=MAX_RETRIES {
            let err = match self.client.post(url).bearer_auth(api_key).json(payload).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes().await?;
                        return serde_json::from_slice(&bytes).map_err(|e| {
                            warn!(error = %e, body = %String::from_utf8_lossy(&bytes), "unparseable chat response");
                            LLMError::Json(e)
                        });
                    }
                    let body = resp.text().await.unwrap_or_default();
                    if !is_retryable(status) {
                        return Err(LLMError::HttpStatus { status, body });
                    }
                    LLMError::HttpStatus { status, body }
                }
                Err(e) => LLMError::Request(e),
            };

            if retry == MAX_RETRIES {
                return Err(err);
            }
            warn!(retry, error = %err, "chat request failed, retrying");
            sleep(Duration::from_millis(BASE_BACKOFF_MS * (1 << retry))).await;
            last_error = Some(err);
        }
        Err(last_error.unwrap_or(LLMError::NotConfigured("retry loop")))
    }
}

impl ContentService for LLMProvider {
    async fn generate(&self, request: &ContentRequest) -> Result<String, ContentError> {
        if !self.is_available() {
            return Err(ContentError::Unavailable("LLM_API_KEY is not set".into()));
        }
        let prompt = prompts::render(request);
        debug!(kind = request.kind(), chars = prompt.user.len(), "content request");
        let reply = self.complete_with_system(prompts::SYSTEM_PROMPT, &prompt.user).await?;
        if reply.trim().is_empty() {
            return Err(ContentError::Empty);
        }
        Ok(reply)
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}
