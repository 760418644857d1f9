//! Agent 编排器：单次请求的状态机
//!
//! Idle → Understanding（记录用户轮次）→ Planning →
//!   - 需要澄清：→ Idle（needs_input），不经过确认与执行
//!   - 否则 → Confirming → Idle（放弃 / 跳过）或 → Executing → Reporting → Idle
//!
//! 每次迁移都按 AgentState::can_transition_to 校验并写入 trace；任何错误都转换为回复文本，
//! process_input 总是返回消息并回到 Idle。相同的重复输入一律按独立请求处理。

use std::sync::Arc;

use uuid::Uuid;

use crate::actions::{format_summary, ActionExecutor, StepResult};
use crate::confirm::{ActionPreview, ConfirmationGate, Decision};
use crate::core::state::{AgentResponse, AgentState};
use crate::memory::ConversationMemory;
use crate::plan::{ActionPlanner, ActionStatus, ExecutionPlan, NOT_UNDERSTOOD};

pub const CANCELLED: &str = "Cancelled. Nothing was executed.";
pub const SKIPPED: &str = "Skipped. Nothing was executed.";
pub const EMPTY_INPUT: &str = "Please type a request, or 'help' to see what I can do.";

pub struct ConversationalAgent {
    id: Uuid,
    state: AgentState,
    trace: Vec<AgentState>,
    memory: ConversationMemory,
    planner: ActionPlanner,
    gate: Arc<ConfirmationGate>,
    executor: ActionExecutor,
}

impl ConversationalAgent {
    pub fn new(
        planner: ActionPlanner,
        gate: Arc<ConfirmationGate>,
        executor: ActionExecutor,
        memory: ConversationMemory,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: AgentState::Idle,
            trace: vec![AgentState::Idle],
            memory,
            planner,
            gate,
            executor,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// 最近一次请求的状态序列
    pub fn trace(&self) -> &[AgentState] {
        &self.trace
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut ConversationMemory {
        &mut self.memory
    }

    pub fn planner(&self) -> &ActionPlanner {
        &self.planner
    }

    pub fn gate(&self) -> &Arc<ConfirmationGate> {
        &self.gate
    }

    /// 清空对话与会话状态
    pub fn reset(&mut self) {
        self.memory.clear();
        tracing::info!(conversation = %self.id, "conversation reset");
    }

    fn transition(&mut self, next: AgentState) {
        if !self.state.can_transition_to(next) {
            // 迁移表之外的路径属于编程错误；仍然前进，保证最终回到 Idle
            tracing::error!(from = %self.state, to = %next, "illegal state transition");
        } else {
            tracing::debug!(conversation = %self.id, from = %self.state, to = %next, "state transition");
        }
        self.state = next;
        self.trace.push(next);
    }

    fn finish(&mut self, response: AgentResponse) -> AgentResponse {
        if self.state != AgentState::Idle {
            self.transition(AgentState::Idle);
        }
        response.with_trace(self.trace.clone())
    }

    pub async fn process_input(&mut self, input: &str) -> AgentResponse {
        self.state = AgentState::Idle;
        self.trace = vec![AgentState::Idle];

        let input = input.trim();
        if input.is_empty() {
            return self.finish(AgentResponse::needs_input(EMPTY_INPUT));
        }

        self.transition(AgentState::Understanding);
        self.memory.add_user_message(input);

        self.transition(AgentState::Planning);
        let mut plan = self.planner.create_plan(input, &mut self.memory).await;

        if plan.needs_clarification || plan.is_empty() {
            let question = plan
                .clarification_question
                .clone()
                .unwrap_or_else(|| NOT_UNDERSTOOD.to_string());
            self.memory.add_assistant_message(question.clone());
            self.transition(AgentState::Idle);
            return self.finish(AgentResponse::needs_input(question).with_plan(plan));
        }

        self.transition(AgentState::Confirming);
        match self.confirm(&mut plan).await {
            Decision::Confirm | Decision::Modify => {}
            decision => {
                let message = if decision == Decision::Skip { SKIPPED } else { CANCELLED };
                tracing::info!(plan_id = %plan.id, ?decision, "plan not executed");
                self.memory.add_assistant_message(message);
                self.transition(AgentState::Idle);
                return self.finish(AgentResponse::message(message).with_plan(plan));
            }
        }

        self.transition(AgentState::Executing);
        let results = self.executor.execute_plan(&mut plan, &mut self.memory).await;

        self.transition(AgentState::Reporting);
        let message = compose_report(&plan, &results);
        self.transition(AgentState::Idle);
        self.finish(
            AgentResponse::message(message)
                .with_plan(plan)
                .with_results(results),
        )
    }

    /// 单步计划逐项确认（可修改参数），多步计划整体确认
    async fn confirm(&self, plan: &mut ExecutionPlan) -> Decision {
        let projects = self.planner.catalog().list().await;
        let previews: Vec<ActionPreview> = plan
            .actions()
            .iter()
            .map(|a| ActionPreview::from_action(a, plan.len(), &projects))
            .collect();

        if let [single] = previews.as_slice() {
            let (decision, params) = self.gate.confirm_action(single).await;
            if let (Decision::Modify, Some(params)) = (decision, params) {
                if let Err(e) = plan.update_parameters(1, params) {
                    tracing::error!(error = %e, "failed to apply edited parameters");
                }
            }
            decision
        } else {
            self.gate.confirm_plan(&previews).await
        }
    }
}

/// 回复文本：单步直接给出结果，多步逐行列出，最后附摘要
fn compose_report(plan: &ExecutionPlan, results: &[StepResult]) -> String {
    let summary = format_summary(&plan.counts());
    if let [only] = results {
        if only.status == ActionStatus::Completed && !only.message.is_empty() {
            return only.message.clone();
        }
    }
    let mut lines: Vec<String> = results
        .iter()
        .map(|r| {
            if r.message.is_empty() {
                format!("{}. {}: {}", r.step, r.description, r.status)
            } else {
                format!("{}. {}: {} ({})", r.step, r.description, r.status, r.message)
            }
        })
        .collect();
    lines.push(summary);
    lines.join("\n")
}
