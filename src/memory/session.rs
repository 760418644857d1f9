//! 会话状态：跨轮次保留的事实（活动项目、最近一次 run、最近一次动作结果、待回答的澄清问题）
//!
//! 只通过 StateUpdate 合并更新，未给出的字段保持不变；唯一的整体重置入口是 ConversationMemory::clear。

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub active_project: Option<String>,
    pub last_run_number: Option<u32>,
    pub last_action: Option<String>,
    pub last_action_result: Option<String>,
    pub last_action_success: Option<bool>,
    pub pending_clarification: Option<String>,
}

impl SessionState {
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(project) = update.active_project {
            self.active_project = Some(project);
        }
        if let Some(run) = update.last_run_number {
            self.last_run_number = Some(run);
        }
        if let Some(action) = update.last_action {
            self.last_action = Some(action);
        }
        if let Some(result) = update.last_action_result {
            self.last_action_result = Some(result);
        }
        if let Some(success) = update.last_action_success {
            self.last_action_success = Some(success);
        }
        if let Some(pending) = update.pending_clarification {
            self.pending_clarification = pending;
        }
    }

    /// 渲染为给模型看的简短事实行（无内容时为空）
    pub fn to_fact_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(project) = &self.active_project {
            lines.push(format!("Active project: {project}"));
        }
        if let Some(run) = self.last_run_number {
            lines.push(format!("Last run: {run}"));
        }
        if let Some(action) = &self.last_action {
            let outcome = match self.last_action_success {
                Some(true) => "succeeded",
                Some(false) => "failed",
                None => "unknown outcome",
            };
            lines.push(format!("Last action: {action} ({outcome})"));
        }
        if let Some(result) = &self.last_action_result {
            lines.push(format!("Last result: {result}"));
        }
        if let Some(question) = &self.pending_clarification {
            lines.push(format!("Waiting for answer to: {question}"));
        }
        lines
    }
}

/// 会话状态的增量更新；None 表示「不修改」
///
/// pending_clarification 是双层 Option：Some(None) 表示清除。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    #[serde(default)]
    pub active_project: Option<String>,
    #[serde(default)]
    pub last_run_number: Option<u32>,
    #[serde(default)]
    pub last_action: Option<String>,
    #[serde(default)]
    pub last_action_result: Option<String>,
    #[serde(default)]
    pub last_action_success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_clarification: Option<Option<String>>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_project(mut self, project: impl Into<String>) -> Self {
        self.active_project = Some(project.into());
        self
    }

    pub fn last_run_number(mut self, run: u32) -> Self {
        self.last_run_number = Some(run);
        self
    }

    pub fn last_action(mut self, action: impl Into<String>, success: bool, result: impl Into<String>) -> Self {
        self.last_action = Some(action.into());
        self.last_action_success = Some(success);
        self.last_action_result = Some(result.into());
        self
    }

    pub fn pending_clarification(mut self, question: Option<String>) -> Self {
        self.pending_clarification = Some(question);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
