//! Ollama 本地模型客户端（默认后端）
//!
//! - 可用性：GET {base}/api/tags，且目标模型已拉取（名称互相包含即可，允许省略 tag）
//! - 生成：POST {base}/api/generate，stream=false，取 response 字段

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::llm::traits::non_empty;
use crate::llm::LlmClient;

pub const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.2:3b";

/// 可用性探测超时（秒）
const PROBE_TIMEOUT_SECS: u64 = 3;

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: Option<&str>, model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url
                .unwrap_or(OLLAMA_DEFAULT_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            temperature: 0.1,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    fn model_matches(&self, installed: &str) -> bool {
        !installed.is_empty() && (installed.contains(&self.model) || self.model.contains(installed))
    }

    async fn request(&self, prompt: &str, instructions: &str) -> Result<String, String> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "system": instructions,
            "stream": false,
            "options": { "temperature": self.temperature },
        });
        let resp = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body: GenerateResponse = resp.json().await.map_err(|e| e.to_string())?;
        Ok(body.response)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        let resp = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .send()
            .await;
        let Ok(resp) = resp else {
            return false;
        };
        if !resp.status().is_success() {
            return false;
        }
        match resp.json::<TagsResponse>().await {
            Ok(tags) => tags.models.iter().any(|m| self.model_matches(&m.name)),
            Err(_) => false,
        }
    }

    async fn generate(&self, prompt: &str, instructions: &str) -> Option<String> {
        match self.request(prompt, instructions).await {
            Ok(text) => non_empty(text),
            Err(e) => {
                tracing::warn!(url = %self.base_url, model = %self.model, error = %e, "Ollama generate failed");
                None
            }
        }
    }
}
