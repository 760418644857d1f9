//! Mock 模型客户端（用于测试与离线演示，无需 API）
//!
//! 按顺序返回预置的响应；队列耗尽后返回 None（等价于后端无响应）。每次调用的 prompt 会被记录，便于断言。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::traits::non_empty;
use crate::llm::LlmClient;

/// 一次 generate 调用的记录
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub prompt: String,
    pub instructions: String,
}

#[derive(Debug)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Option<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
    available: bool,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            available: true,
        }
    }

    /// 依次返回给定响应
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for r in responses {
            mock.push_response(r);
        }
        mock
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn push_response(&self, response: impl Into<String>) {
        if let Ok(mut q) = self.responses.lock() {
            q.push_back(Some(response.into()));
        }
    }

    /// 预置一次「无响应」
    pub fn push_silence(&self) {
        if let Ok(mut q) = self.responses.lock() {
            q.push_back(None);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(&self, prompt: &str, instructions: &str) -> Option<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                prompt: prompt.to_string(),
                instructions: instructions.to_string(),
            });
        }
        if !self.available {
            return None;
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .flatten()
            .and_then(non_empty)
    }
}
