//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；支持 DeepSeek、OpenAI、自建代理等。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::traits::non_empty;
use crate::llm::LlmClient;

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
        )
    }
}

pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    timeout: Duration,
    has_key: bool,
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty());
        let has_key = api_key.is_some();

        let mut config = OpenAIConfig::new().with_api_key(api_key.unwrap_or_default());
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature: 0.1,
            timeout: Duration::from_secs(30),
            has_key,
            usage: TokenUsage::default(),
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

    fn build_messages(
        prompt: &str,
        instructions: &str,
    ) -> Result<Vec<ChatCompletionRequestMessage>, String> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(instructions.to_string())
            .build()
            .map_err(|e| e.to_string())?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .map_err(|e| e.to_string())?;
        Ok(vec![
            ChatCompletionRequestMessage::System(system),
            ChatCompletionRequestMessage::User(user),
        ])
    }

    async fn complete(&self, prompt: &str, instructions: &str) -> Result<String, String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages(Self::build_messages(prompt, instructions)?)
            .build()
            .map_err(|e| e.to_string())?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| format!("request timed out after {}s", self.timeout.as_secs()))?
            .map_err(|e| e.to_string())?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
            let (prompt_total, completion_total) = self.usage.get();
            tracing::debug!(model = %self.model, prompt_total, completion_total, "token usage");
        }

        Ok(response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        self.has_key
    }

    async fn generate(&self, prompt: &str, instructions: &str) -> Option<String> {
        if !self.has_key {
            tracing::warn!(model = %self.model, "OpenAI-compatible backend has no API key");
            return None;
        }
        match self.complete(prompt, instructions).await {
            Ok(text) => non_empty(text),
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "OpenAI-compatible generate failed");
                None
            }
        }
    }
}
