//! ActionPlanner：计划构建策略
//!
//! 总是先尝试 Tier A；Tier A 校验失败时静默回退到 Tier B（调用方不感知由哪一级产生）。
//! Tier B 也失败时返回带重述请求的澄清计划。模型完全无响应时不再回退，直接返回澄清计划。
//!
//! 必填参数的补全也在这里完成：缺少项目时，依次尝试会话中的活动项目、唯一配置的项目，
//! 仍无法确定则生成点名所有候选项目的澄清问题。

use std::sync::Arc;

use crate::intent::{
    ActionKind, DraftStep, IntentParser, ParamMap, ParseError, PlanOutcome, RESOURCE_PARAM,
};
use crate::llm::LlmClient;
use crate::memory::{ConversationMemory, StateUpdate};
use crate::plan::types::{ExecutionPlan, PlannedAction};
use crate::resources::ResourceCatalog;

pub const REPHRASE: &str = "Could you rephrase your request? For example: \"run tests on <project>\".";
pub const NOT_UNDERSTOOD: &str = "Request not understood. Could you rephrase it?";
pub const NO_RESPONSE: &str =
    "The language model did not respond. Check that the model provider is running, then try again.";

pub struct ActionPlanner {
    parser: IntentParser,
    catalog: Arc<dyn ResourceCatalog>,
}

impl ActionPlanner {
    pub fn new(llm: Arc<dyn LlmClient>, catalog: Arc<dyn ResourceCatalog>) -> Self {
        Self {
            parser: IntentParser::new(llm),
            catalog,
        }
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        self.parser.llm()
    }

    pub fn catalog(&self) -> &Arc<dyn ResourceCatalog> {
        &self.catalog
    }

    /// 构建计划，并同步会话中的 pending_clarification
    pub async fn create_plan(&self, input: &str, memory: &mut ConversationMemory) -> ExecutionPlan {
        let plan = self.build_plan(input, memory).await;
        let pending = plan
            .needs_clarification
            .then(|| plan.clarification_question.clone())
            .flatten();
        memory.update_state(StateUpdate::new().pending_clarification(pending));
        plan
    }

    async fn build_plan(&self, input: &str, memory: &ConversationMemory) -> ExecutionPlan {
        let projects = self.catalog.list().await;
        let context = memory.get_context_for_llm(true);

        let (goal, steps) = match self.parser.parse_plan(input, &context, &projects).await {
            Ok(PlanOutcome::Steps { goal, steps }) => {
                tracing::debug!(tier = "A", steps = steps.len(), "plan decoded");
                (goal, steps)
            }
            Ok(PlanOutcome::Clarify { goal, question }) => {
                tracing::debug!(tier = "A", "model asked for clarification");
                return ExecutionPlan::clarification(goal, question);
            }
            Ok(PlanOutcome::NotUnderstood { goal }) => {
                tracing::debug!(tier = "A", "request not understood");
                return ExecutionPlan::clarification(goal, NOT_UNDERSTOOD);
            }
            Err(ParseError::NoResponse) => {
                tracing::warn!(provider = %self.parser.llm().name(), "no response from model provider");
                return ExecutionPlan::clarification(input, NO_RESPONSE);
            }
            Err(e) => {
                tracing::info!(error = %e, "Tier A rejected, falling back to single intent");
                let intent = self.parser.parse_intent(input, &context, &projects).await;
                if intent.is_unknown() {
                    let question = match intent.error.as_deref() {
                        Some(err) if !err.is_empty() => format!("{err}. {REPHRASE}"),
                        _ => REPHRASE.to_string(),
                    };
                    tracing::info!(tier = "B", "single intent rejected");
                    return ExecutionPlan::clarification(input, question);
                }
                tracing::debug!(tier = "B", action = %intent.action, "intent decoded");
                let step = DraftStep {
                    step: 1,
                    action: intent.action,
                    params: intent.params,
                    depends_on: None,
                };
                (input.to_string(), vec![step])
            }
        };

        let active = memory.state().active_project.as_deref();
        let mut actions = Vec::with_capacity(steps.len());
        for step in steps {
            let params = match resolve_required(step.action, step.params, active, &projects) {
                Ok(p) => p,
                Err(question) => return ExecutionPlan::clarification(goal, question),
            };
            actions.push(PlannedAction::new(step.step, step.action, params, step.depends_on));
        }

        match ExecutionPlan::new(goal.clone(), actions) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, "plan failed validation");
                ExecutionPlan::clarification(goal, format!("{e}. {REPHRASE}"))
            }
        }
    }
}

/// 补全必填参数；无法补全时返回澄清问题
fn resolve_required(
    action: ActionKind,
    mut params: ParamMap,
    active_project: Option<&str>,
    projects: &[String],
) -> Result<ParamMap, String> {
    let Some(spec) = action.spec() else {
        return Ok(params);
    };
    for param in spec.required_params() {
        if params.contains_key(param.name) {
            continue;
        }
        if param.name != RESOURCE_PARAM {
            return Err(format!(
                "Missing {} for {}. Please specify it.",
                param.name,
                action.display_name().to_lowercase()
            ));
        }
        let implied = active_project
            .filter(|p| projects.iter().any(|known| known == p))
            .map(str::to_string)
            .or_else(|| (projects.len() == 1).then(|| projects[0].clone()));
        match implied {
            Some(project) => {
                params.insert(RESOURCE_PARAM.to_string(), project.into());
            }
            None if projects.is_empty() => {
                return Err("No projects are configured. Add one to [app] projects or projects_dir.".to_string())
            }
            None => {
                return Err(format!(
                    "Which project should I use for {}? Available: {}",
                    action.display_name().to_lowercase(),
                    projects.join(", ")
                ))
            }
        }
    }
    Ok(params)
}
