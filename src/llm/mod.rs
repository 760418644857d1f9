//! 模型适配层：LlmClient 抽象与实现（Ollama / OpenAI 兼容 / DeepSeek / Anthropic / Mock）

pub mod anthropic;
pub mod deepseek;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod traits;

pub use anthropic::AnthropicClient;
pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT};
pub use mock::{MockLlmClient, RecordedCall};
pub use ollama::OllamaClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::LlmClient;

/// 后端不可用时给用户的配置指引
pub fn setup_instructions(provider: &str) -> &'static str {
    match provider {
        "ollama" => {
            "To use Ollama:\n  1. Install it: https://ollama.com/download\n  2. Start the server: ollama serve\n  3. Pull a model: ollama pull llama3.2:3b"
        }
        "anthropic" => {
            "To use Anthropic:\n  1. Create an API key at console.anthropic.com\n  2. export ANTHROPIC_API_KEY=\"sk-...\"\n  3. Set [llm] provider = \"anthropic\""
        }
        "openai" => {
            "To use OpenAI:\n  1. Create an API key at platform.openai.com\n  2. export OPENAI_API_KEY=\"sk-...\"\n  3. Set [llm] provider = \"openai\""
        }
        "deepseek" => {
            "To use DeepSeek:\n  1. Create an API key at platform.deepseek.com\n  2. export DEEPSEEK_API_KEY=\"sk-...\"\n  3. Set [llm] provider = \"deepseek\""
        }
        _ => "",
    }
}
