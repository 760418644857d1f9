//! 错误类型
//!
//! AgentError 是编排层对外可见的错误；PlanError 描述计划不变量被破坏（状态回退、步号缺口等）。
//! 所有错误最终都会在 Orchestrator 中被转换为回复文本，不会抛给 process_input 的调用方。

use thiserror::Error;

use crate::plan::ActionStatus;

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 模型后端不可达或未配置凭据
    #[error("Model provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("No provider registered for action '{0}'")]
    UnregisteredAction(String),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("Invalid plan: {0}")]
    Plan(#[from] PlanError),

    #[error("Config error: {0}")]
    ConfigError(String),
}

/// 计划不变量错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("step {step}: cannot move from {from} to {to}")]
    InvalidTransition {
        step: u32,
        from: ActionStatus,
        to: ActionStatus,
    },

    #[error("step {0} not found")]
    StepNotFound(u32),

    #[error("step numbers must be contiguous starting at 1 (found {found} at position {position})")]
    NonContiguousSteps { position: usize, found: u32 },

    #[error("step {step} depends on step {depends_on}, which is not an earlier step")]
    InvalidDependency { step: u32, depends_on: u32 },

    #[error("a plan that needs clarification must not carry actions")]
    ClarificationWithActions,
}
