use crate::store::ChatMessage;
use crate::{MurmurError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error};

/// Prompt + ordered history in, single reply text out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        history: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String>;
}

/// Configuration for LlmClient loaded from environment variables
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub base_url: String, // e.g., https://api.deepseek.com/v1
    pub model: String,    // e.g., deepseek-chat
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    pub temperature: f32,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("DEEPSEEK_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "https://api.deepseek.com/v1".to_string()),
            model: std::env::var("DEEPSEEK_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "deepseek-chat".to_string()),
            api_key: std::env::var("DEEPSEEK_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            request_timeout_ms: std::env::var("DEEPSEEK_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30_000),
            temperature: std::env::var("DEEPSEEK_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(0.7),
        }
    }
}

/// HTTP client for the OpenAI-compatible Chat Completions API
#[derive(Clone)]
pub struct LlmClient {
    pub(crate) http: Client,
    pub(crate) cfg: LlmClientConfig,
}

impl LlmClient {
    pub fn new(cfg: LlmClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| MurmurError::LlmError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, cfg })
    }

    /// Share an existing connection pool; the request timeout is applied per call.
    pub fn with_http(http: Client, cfg: LlmClientConfig) -> Self {
        Self { http, cfg }
    }

    pub fn from_env() -> Result<Self> {
        Self::new(LlmClientConfig::default())
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.cfg
    }
}

/// Chat payload: system message, then history, then the new user turn.
pub(crate) fn build_messages(
    system: &str,
    prompt: &str,
    history: &[ChatMessage],
) -> Vec<serde_json::Value> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if !system.is_empty() {
        messages.push(json!({"role": "system", "content": system}));
    }
    for m in history {
        messages.push(json!({"role": m.role, "content": m.content}));
    }
    messages.push(json!({"role": "user", "content": prompt}));
    messages
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        history: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String> {
        let chat_url = format!(
            "{}/chat/completions",
            self.cfg.base_url.trim_end_matches('/')
        );
        debug!(target = "llm_client", history = history.len(), "POST {}", chat_url);

        let mut req = self
            .http
            .post(&chat_url)
            .timeout(Duration::from_millis(self.cfg.request_timeout_ms))
            .header("content-type", "application/json");
        if let Some(key) = &self.cfg.api_key {
            req = req.bearer_auth(key);
        }

        let body = json!({
            "model": self.cfg.model,
            "messages": build_messages(system, prompt, history),
            "max_tokens": max_tokens,
            "temperature": self.cfg.temperature,
        });

        let resp = req
            .json(&body)
            .send()
            .await
            .map_err(|e| MurmurError::LlmError(format!("Chat Completions HTTP error: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(target = "llm_client", %status, body = %text, "Chat Completions error");
            return Err(MurmurError::LlmError(format!(
                "Chat Completions error: status={} body={}",
                status, text
            )));
        }

        let val: serde_json::Value = resp.json().await.map_err(|e| {
            MurmurError::LlmError(format!("Failed to parse Chat Completions JSON: {e}"))
        })?;
        let text = extract_text_from_chat_completions(&val).ok_or_else(|| {
            MurmurError::LlmError("Missing choices[0].message.content in chat completions".into())
        })?;
        Ok(text.trim().to_string())
    }
}

fn extract_text_from_chat_completions(v: &serde_json::Value) -> Option<String> {
    v.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}
