//! 计划类型：ActionStatus / PlannedAction / ExecutionPlan
//!
//! 不变量在这里集中维护：
//! - 步号为 1..N 连续；depends_on 只能指向更早的步骤
//! - 需要澄清的计划不含任何动作
//! - 步骤状态只能前进（pending → executing → completed/failed，pending → skipped）

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::PlanError;
use crate::intent::{ActionKind, Intent, ParamMap};
use crate::plan::describe::describe_action;

/// 步骤状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// 等待执行
    Pending,
    /// 正在执行
    Executing,
    /// 已完成
    Completed,
    /// 失败
    Failed,
    /// 跳过（依赖未满足或用户取消）
    Skipped,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Executing => "executing",
            ActionStatus::Completed => "completed",
            ActionStatus::Failed => "failed",
            ActionStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionStatus::Completed | ActionStatus::Failed | ActionStatus::Skipped
        )
    }

    pub fn can_transition_to(&self, next: ActionStatus) -> bool {
        use ActionStatus::*;
        matches!(
            (self, next),
            (Pending, Executing) | (Pending, Skipped) | (Executing, Completed) | (Executing, Failed)
        )
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 计划中的一步
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
    pub step_number: u32,
    pub action: ActionKind,
    pub parameters: ParamMap,
    pub description: String,
    pub depends_on: Option<u32>,
    status: ActionStatus,
    pub result_message: Option<String>,
}

impl PlannedAction {
    /// 描述由动作与参数确定性生成
    pub fn new(step_number: u32, action: ActionKind, parameters: ParamMap, depends_on: Option<u32>) -> Self {
        let description = describe_action(action, &parameters);
        Self {
            step_number,
            action,
            parameters,
            description,
            depends_on,
            status: ActionStatus::Pending,
            result_message: None,
        }
    }

    pub fn status(&self) -> ActionStatus {
        self.status
    }

    pub fn transition(&mut self, to: ActionStatus, message: Option<String>) -> Result<(), PlanError> {
        if !self.status.can_transition_to(to) {
            return Err(PlanError::InvalidTransition {
                step: self.step_number,
                from: self.status,
                to,
            });
        }
        self.status = to;
        if message.is_some() {
            self.result_message = message;
        }
        Ok(())
    }

    /// 替换参数并重新生成描述；只允许在执行前修改
    pub fn set_parameters(&mut self, parameters: ParamMap) -> Result<(), PlanError> {
        if self.status != ActionStatus::Pending {
            return Err(PlanError::InvalidTransition {
                step: self.step_number,
                from: self.status,
                to: ActionStatus::Pending,
            });
        }
        self.description = describe_action(self.action, &parameters);
        self.parameters = parameters;
        Ok(())
    }

    pub fn to_intent(&self, raw_text: &str) -> Intent {
        Intent::new(self.action, self.parameters.clone()).with_raw_text(raw_text)
    }
}

/// 各状态的步骤计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanCounts {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pending: usize,
    pub total: usize,
}

/// 执行计划
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionPlan {
    pub id: Uuid,
    pub goal: String,
    actions: Vec<PlannedAction>,
    pub needs_clarification: bool,
    pub clarification_question: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ExecutionPlan {
    pub fn new(goal: impl Into<String>, actions: Vec<PlannedAction>) -> Result<Self, PlanError> {
        let plan = Self {
            id: Uuid::new_v4(),
            goal: goal.into(),
            actions,
            needs_clarification: false,
            clarification_question: None,
            created_at: Utc::now(),
        };
        plan.validate()?;
        Ok(plan)
    }

    /// 需要澄清的计划（无动作）
    pub fn clarification(goal: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            goal: goal.into(),
            actions: Vec::new(),
            needs_clarification: true,
            clarification_question: Some(question.into()),
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.needs_clarification && !self.actions.is_empty() {
            return Err(PlanError::ClarificationWithActions);
        }
        for (idx, action) in self.actions.iter().enumerate() {
            let expected = idx as u32 + 1;
            if action.step_number != expected {
                return Err(PlanError::NonContiguousSteps {
                    position: idx + 1,
                    found: action.step_number,
                });
            }
            if let Some(dep) = action.depends_on {
                if dep == 0 || dep >= action.step_number {
                    return Err(PlanError::InvalidDependency {
                        step: action.step_number,
                        depends_on: dep,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn actions(&self) -> &[PlannedAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get_action(&self, step: u32) -> Option<&PlannedAction> {
        step.checked_sub(1)
            .and_then(|i| self.actions.get(i as usize))
    }

    fn action_mut(&mut self, step: u32) -> Result<&mut PlannedAction, PlanError> {
        step.checked_sub(1)
            .and_then(|i| self.actions.get_mut(i as usize))
            .ok_or(PlanError::StepNotFound(step))
    }

    pub fn transition(&mut self, step: u32, to: ActionStatus, message: Option<String>) -> Result<(), PlanError> {
        self.action_mut(step)?.transition(to, message)
    }

    pub fn mark_executing(&mut self, step: u32) -> Result<(), PlanError> {
        self.transition(step, ActionStatus::Executing, None)
    }

    pub fn mark_completed(&mut self, step: u32, message: impl Into<String>) -> Result<(), PlanError> {
        self.transition(step, ActionStatus::Completed, Some(message.into()))
    }

    pub fn mark_failed(&mut self, step: u32, message: impl Into<String>) -> Result<(), PlanError> {
        self.transition(step, ActionStatus::Failed, Some(message.into()))
    }

    pub fn mark_skipped(&mut self, step: u32, reason: impl Into<String>) -> Result<(), PlanError> {
        self.transition(step, ActionStatus::Skipped, Some(reason.into()))
    }

    /// 把 `after` 之后所有仍为 pending 的步骤标记为 skipped，返回被跳过的步号
    pub fn skip_remaining(&mut self, after: u32, reason: &str) -> Vec<u32> {
        let mut skipped = Vec::new();
        for action in self.actions.iter_mut().filter(|a| a.step_number > after) {
            if action.status == ActionStatus::Pending
                && action
                    .transition(ActionStatus::Skipped, Some(reason.to_string()))
                    .is_ok()
            {
                skipped.push(action.step_number);
            }
        }
        skipped
    }

    pub fn update_parameters(&mut self, step: u32, parameters: ParamMap) -> Result<(), PlanError> {
        self.action_mut(step)?.set_parameters(parameters)
    }

    /// depends_on 指向的步骤是否已完成（无依赖视为满足）
    pub fn dependency_satisfied(&self, step: u32) -> bool {
        match self.get_action(step).and_then(|a| a.depends_on) {
            None => true,
            Some(dep) => self
                .get_action(dep)
                .is_some_and(|d| d.status == ActionStatus::Completed),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.actions.iter().all(|a| a.status.is_terminal())
    }

    pub fn counts(&self) -> PlanCounts {
        let mut counts = PlanCounts {
            total: self.actions.len(),
            ..PlanCounts::default()
        };
        for action in &self.actions {
            match action.status {
                ActionStatus::Completed => counts.completed += 1,
                ActionStatus::Failed => counts.failed += 1,
                ActionStatus::Skipped => counts.skipped += 1,
                ActionStatus::Pending | ActionStatus::Executing => counts.pending += 1,
            }
        }
        counts
    }
}
