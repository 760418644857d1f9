//! 状态机定义：AgentState 与单次请求的结果 AgentResponse
//!
//! 每个请求都从 Idle 出发并回到 Idle；合法迁移由 AgentState::can_transition_to 描述，
//! Orchestrator 每次迁移都会检查并记录到 trace 中。

use serde::Serialize;

use crate::actions::StepResult;
use crate::plan::ExecutionPlan;

/// Agent 状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Idle,
    Understanding,
    Planning,
    Confirming,
    Executing,
    Reporting,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Idle => "idle",
            AgentState::Understanding => "understanding",
            AgentState::Planning => "planning",
            AgentState::Confirming => "confirming",
            AgentState::Executing => "executing",
            AgentState::Reporting => "reporting",
        }
    }

    /// 迁移表：
    /// Idle → Understanding → Planning → (Idle | Confirming)，
    /// Confirming → (Idle | Executing)，Executing → Reporting → Idle
    pub fn can_transition_to(&self, next: AgentState) -> bool {
        use AgentState::*;
        matches!(
            (self, next),
            (Idle, Understanding)
                | (Understanding, Planning)
                | (Planning, Idle)
                | (Planning, Confirming)
                | (Confirming, Idle)
                | (Confirming, Executing)
                | (Executing, Reporting)
                | (Reporting, Idle)
        )
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// process_input 的返回值：回复文本、最终状态（总是 Idle）、关联计划
#[derive(Clone, Debug, Serialize)]
pub struct AgentResponse {
    pub message: String,
    pub state: AgentState,
    pub plan: Option<ExecutionPlan>,
    /// 需要用户补充信息（澄清问题 / 未理解）
    pub needs_input: bool,
    /// 需要用户回答的问题
    pub prompt: Option<String>,
    /// 每步执行结果（未执行时为空）
    pub results: Vec<StepResult>,
    /// 本次请求经过的状态序列（首尾均为 Idle）
    pub trace: Vec<AgentState>,
}

impl AgentResponse {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            state: AgentState::Idle,
            plan: None,
            needs_input: false,
            prompt: None,
            results: Vec::new(),
            trace: Vec::new(),
        }
    }

    pub fn needs_input(question: impl Into<String>) -> Self {
        let question = question.into();
        Self {
            message: question.clone(),
            state: AgentState::Idle,
            plan: None,
            needs_input: true,
            prompt: Some(question),
            results: Vec::new(),
            trace: Vec::new(),
        }
    }

    pub fn with_plan(mut self, plan: ExecutionPlan) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn with_results(mut self, results: Vec<StepResult>) -> Self {
        self.results = results;
        self
    }

    pub fn with_trace(mut self, trace: Vec<AgentState>) -> Self {
        self.trace = trace;
        self
    }
}
