//! 动作提供者注册表
//!
//! 所有动作实现 ActionProvider（tag / execute），由 ActionRegistry 按标签字符串注册与查找。
//! 编排核心只按 Intent.action 的标签分发，不包含任何具体动作的逻辑；新增动作只需注册新的提供者。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::AgentError;
use crate::intent::Intent;
use crate::memory::StateUpdate;

/// 提供者的执行结果；state 为需要合并进 SessionState 的变化（例如新产生的 run 编号）
#[derive(Debug, Clone, Default)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
    pub state: StateUpdate,
}

impl ActionOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_state(mut self, state: StateUpdate) -> Self {
        self.state = state;
        self
    }
}

#[async_trait]
pub trait ActionProvider: Send + Sync {
    /// 负责的动作标签（如 "run_tests"）
    fn tag(&self) -> &str;

    /// 执行动作；Err 会被执行器记为该步失败
    async fn execute(&self, intent: &Intent) -> Result<ActionOutcome, AgentError>;
}

#[derive(Default)]
pub struct ActionRegistry {
    providers: HashMap<String, Arc<dyn ActionProvider>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同一标签重复注册时后者覆盖前者
    pub fn register(&mut self, provider: impl ActionProvider + 'static) {
        self.register_arc(Arc::new(provider));
    }

    pub fn register_arc(&mut self, provider: Arc<dyn ActionProvider>) {
        let tag = provider.tag().to_string();
        if self.providers.insert(tag.clone(), provider).is_some() {
            tracing::debug!(tag = %tag, "replaced action provider");
        }
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn ActionProvider>> {
        self.providers.get(tag).cloned()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.providers.contains_key(tag)
    }

    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.providers.keys().cloned().collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
