//! 模型适配器抽象
//!
//! 所有后端（Ollama / OpenAI 兼容 / DeepSeek / Anthropic / Mock）实现 LlmClient：
//! generate 在任何失败（超时、网络、缺少凭据）时返回 None，而不是错误；调用方把 None 视为「无响应」。

use async_trait::async_trait;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 后端名称（日志与提示用）
    fn name(&self) -> &str;

    /// 模型名称
    fn model(&self) -> &str;

    /// 轻量可用性探测（可达 / 凭据存在）
    async fn is_available(&self) -> bool;

    /// prompt 为用户侧内容，instructions 为系统指令；空文本同样视为无响应
    async fn generate(&self, prompt: &str, instructions: &str) -> Option<String>;
}

/// 去掉空白后为空的响应视为无响应
pub(crate) fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
