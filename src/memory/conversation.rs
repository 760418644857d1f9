//! 短期记忆：对话历史 + 会话状态
//!
//! 保留最近 max_turns 个 Turn（FIFO 剪枝），SessionState 不随剪枝丢失。
//! get_context_for_llm 是解析器能看到的唯一上下文通道。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::memory::{SessionState, StateUpdate};

/// 默认保留的 Turn 数
pub const DEFAULT_MAX_TURNS: usize = 20;
/// 渲染给模型的最近 Turn 数
pub const CONTEXT_TURNS: usize = 10;

/// 消息角色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// 单个对话轮次；创建后不可变（字段只读）
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationTurn {
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
    metadata: BTreeMap<String, Value>,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>, metadata: BTreeMap<String, Value>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ConversationMemory {
    turns: Vec<ConversationTurn>,
    state: SessionState,
    max_turns: usize,
    context_turns: usize,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            state: SessionState::default(),
            max_turns: max_turns.max(1),
            context_turns: CONTEXT_TURNS,
        }
    }

    /// 渲染上下文时使用的最近 Turn 数（默认 10）
    pub fn with_context_turns(mut self, context_turns: usize) -> Self {
        self.context_turns = context_turns;
        self
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.push(Role::User, content.into(), BTreeMap::new());
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content.into(), BTreeMap::new());
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.push(Role::System, content.into(), BTreeMap::new());
    }

    /// 带元数据追加（如关联的 plan_id）
    pub fn add_message_with_metadata(
        &mut self,
        role: Role,
        content: impl Into<String>,
        metadata: BTreeMap<String, Value>,
    ) {
        self.push(role, content.into(), metadata);
    }

    fn push(&mut self, role: Role, content: String, metadata: BTreeMap<String, Value>) {
        self.turns.push(ConversationTurn::new(role, content, metadata));
        self.prune();
    }

    /// 超出 max_turns 时丢弃最旧的 Turn
    fn prune(&mut self) {
        if self.turns.len() > self.max_turns {
            let excess = self.turns.len() - self.max_turns;
            self.turns.drain(..excess);
        }
    }

    pub fn update_state(&mut self, update: StateUpdate) {
        if update.is_empty() {
            return;
        }
        self.state.apply(update);
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// 渲染上下文：会话状态事实行（可选）+ 最近若干轮 "role: text"
    ///
    /// 纯函数，无副作用；相同内存状态两次调用结果相同。
    pub fn get_context_for_llm(&self, include_state: bool) -> String {
        let mut parts = Vec::new();

        if include_state {
            let facts = self.state.to_fact_lines();
            if !facts.is_empty() {
                let body: Vec<String> = facts.iter().map(|f| format!("  - {f}")).collect();
                parts.push(format!("SESSION STATE:\n{}", body.join("\n")));
            }
        }

        let start = self.turns.len().saturating_sub(self.context_turns);
        let recent = &self.turns[start..];
        if !recent.is_empty() {
            let lines: Vec<String> = recent
                .iter()
                .map(|t| format!("{}: {}", t.role.as_str(), t.content))
                .collect();
            parts.push(format!("RECENT CONVERSATION:\n{}", lines.join("\n")));
        }

        if parts.is_empty() {
            "No previous context.".to_string()
        } else {
            parts.join("\n\n")
        }
    }

    pub fn last_user_message(&self) -> Option<&str> {
        self.last_of(Role::User)
    }

    pub fn last_assistant_message(&self) -> Option<&str> {
        self.last_of(Role::Assistant)
    }

    fn last_of(&self, role: Role) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == role)
            .map(|t| t.content.as_str())
    }

    /// 完全重置：轮次与会话状态
    pub fn clear(&mut self) {
        self.turns.clear();
        self.state = SessionState::default();
    }

    /// 仅清空轮次，保留会话状态
    pub fn clear_turns(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_keeps_most_recent_in_order() {
        let mut memory = ConversationMemory::new(5);
        for i in 0..8 {
            memory.add_user_message(format!("msg {i}"));
        }
        assert_eq!(memory.len(), 5);
        let kept: Vec<&str> = memory.turns().iter().map(|t| t.content()).collect();
        assert_eq!(kept, vec!["msg 3", "msg 4", "msg 5", "msg 6", "msg 7"]);
    }

    #[test]
    fn test_below_capacity_keeps_everything() {
        let mut memory = ConversationMemory::new(20);
        for i in 0..7 {
            memory.add_assistant_message(format!("reply {i}"));
        }
        assert_eq!(memory.len(), 7);
    }

    #[test]
    fn test_context_renders_last_ten_turns() {
        let mut memory = ConversationMemory::new(20);
        for i in 0..15 {
            memory.add_user_message(format!("line-{i:02}"));
        }
        let ctx = memory.get_context_for_llm(false);
        assert!(!ctx.contains("line-04"));
        assert!(ctx.contains("line-05"));
        assert!(ctx.contains("user: line-14"));
        assert!(!ctx.contains("SESSION STATE"));
    }

    #[test]
    fn test_context_is_idempotent() {
        let mut memory = ConversationMemory::default();
        memory.add_user_message("run tests on acme");
        memory.add_assistant_message("Completed: 1/1");
        memory.update_state(StateUpdate::new().active_project("acme"));
        assert_eq!(memory.get_context_for_llm(true), memory.get_context_for_llm(true));
    }

    #[test]
    fn test_empty_context() {
        let memory = ConversationMemory::default();
        assert_eq!(memory.get_context_for_llm(true), "No previous context.");
    }

    #[test]
    fn test_clear_turns_keeps_state() {
        let mut memory = ConversationMemory::default();
        memory.add_user_message("hi");
        memory.update_state(StateUpdate::new().active_project("acme"));

        memory.clear_turns();
        assert!(memory.is_empty());
        assert_eq!(memory.state().active_project.as_deref(), Some("acme"));

        memory.clear();
        assert!(memory.state().active_project.is_none());
    }

    #[test]
    fn test_last_messages() {
        let mut memory = ConversationMemory::default();
        memory.add_user_message("first");
        memory.add_assistant_message("answer");
        memory.add_system_message("note");
        memory.add_user_message("second");
        assert_eq!(memory.last_user_message(), Some("second"));
        assert_eq!(memory.last_assistant_message(), Some("answer"));
    }
}
