//! DeepSeek API 客户端（OpenAI 兼容格式）
//!
//! - Base URL: https://api.deepseek.com
//! - 模型: deepseek-chat（命令解析足够）；deepseek-reasoner 响应较慢，不推荐用于解析

use crate::llm::OpenAiClient;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 创建 DeepSeek 客户端
///
/// - API Key 优先用参数，其次环境变量 `DEEPSEEK_API_KEY`
/// - 模型未指定时用 `DEEPSEEK_MODEL` 或 deepseek-chat
pub fn create_deepseek_client(model: Option<&str>, api_key: Option<&str>) -> OpenAiClient {
    let api_key = api_key
        .map(String::from)
        .or_else(|| std::env::var("DEEPSEEK_API_KEY").ok());

    let model = model
        .map(String::from)
        .or_else(|| std::env::var("DEEPSEEK_MODEL").ok())
        .unwrap_or_else(|| DEEPSEEK_CHAT.to_string());

    OpenAiClient::new(Some(DEEPSEEK_BASE_URL), &model, api_key.as_deref())
}
