//! Anthropic Messages API 客户端（reqwest 直连）

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::llm::traits::non_empty;
use crate::llm::LlmClient;

pub const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

const MAX_TOKENS: u32 = 1024;

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

pub struct AnthropicClient {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl AnthropicClient {
    pub fn new(model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.trim().is_empty());
        Self {
            client: Client::new(),
            url: ANTHROPIC_URL.to_string(),
            api_key,
            model: model.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    async fn request(&self, api_key: &str, prompt: &str, instructions: &str) -> Result<String, String> {
        let payload = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": instructions,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let resp = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body: MessagesResponse = resp.json().await.map_err(|e| e.to_string())?;
        Ok(body
            .content
            .into_iter()
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, prompt: &str, instructions: &str) -> Option<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("Anthropic backend has no API key");
            return None;
        };
        match self.request(api_key, prompt, instructions).await {
            Ok(text) => non_empty(text),
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "Anthropic generate failed");
                None
            }
        }
    }
}
