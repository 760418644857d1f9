//! ActionExecutor：按顺序执行已确认的计划
//!
//! 每一步：依赖未完成 → skipped（不调用提供者、不询问是否继续）；否则 executing → 调用提供者 → completed / failed，
//! 并把提供者报告的状态变化合并进 SessionState。非最后一步失败时询问是否继续，拒绝则其余 pending 步骤全部 skipped。
//! 每次分发输出一行 JSON 审计日志；循环结束后把摘要作为 assistant 轮次写入记忆。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use crate::actions::registry::{ActionOutcome, ActionRegistry};
use crate::confirm::ConfirmationGate;
use crate::core::{AgentError, PlanError};
use crate::intent::{ActionKind, Intent};
use crate::memory::{ConversationMemory, Role, StateUpdate};
use crate::plan::{ActionStatus, ExecutionPlan, PlanCounts};

pub const DEPENDENCY_NOT_SATISFIED: &str = "dependency not satisfied";
pub const CANCELLED_AFTER_FAILURE: &str = "cancelled after prior failure";

/// 单步结果（与计划中的步骤一一对应、顺序一致）
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step: u32,
    pub action: ActionKind,
    pub description: String,
    pub status: ActionStatus,
    pub message: String,
    pub data: Option<Value>,
}

impl StepResult {
    pub fn succeeded(&self) -> bool {
        self.status == ActionStatus::Completed
    }
}

pub struct ActionExecutor {
    registry: ActionRegistry,
    gate: Arc<ConfirmationGate>,
}

impl ActionExecutor {
    pub fn new(registry: ActionRegistry, gate: Arc<ConfirmationGate>) -> Self {
        Self { registry, gate }
    }

    pub async fn execute_plan(
        &self,
        plan: &mut ExecutionPlan,
        memory: &mut ConversationMemory,
    ) -> Vec<StepResult> {
        let total = plan.len();
        let mut data: HashMap<u32, Value> = HashMap::new();

        for idx in 0..total {
            let step = idx as u32 + 1;
            let Some(action) = plan.get_action(step).cloned() else {
                break;
            };
            if action.status() != ActionStatus::Pending {
                continue;
            }

            if !plan.dependency_satisfied(step) {
                tracing::info!(plan_id = %plan.id, step, depends_on = ?action.depends_on, "skipping step");
                log_plan_error(plan.mark_skipped(step, DEPENDENCY_NOT_SATISFIED));
                self.gate.show_result(
                    false,
                    &format!("Step {step} skipped: {DEPENDENCY_NOT_SATISFIED}"),
                );
                continue;
            }

            self.gate.show_progress(step, total, &action.description);
            log_plan_error(plan.mark_executing(step));

            let intent = action.to_intent(&plan.goal);
            let outcome = self.dispatch(&intent).await;

            if outcome.success {
                log_plan_error(plan.mark_completed(step, outcome.message.clone()));
            } else {
                log_plan_error(plan.mark_failed(step, outcome.message.clone()));
            }
            self.record_state(memory, &intent, &outcome);
            self.gate.show_result(outcome.success, &outcome.message);
            if let Some(value) = outcome.data {
                data.insert(step, value);
            }

            if !outcome.success && idx + 1 < total {
                let proceed = self
                    .gate
                    .ask_continue_after_failure(step, &outcome.message)
                    .await;
                if !proceed {
                    let skipped = plan.skip_remaining(step, CANCELLED_AFTER_FAILURE);
                    tracing::info!(plan_id = %plan.id, step, skipped = skipped.len(), "plan cancelled after failure");
                    break;
                }
            }
        }

        let counts = plan.counts();
        let summary = format_summary(&counts);
        let metadata = BTreeMap::from([
            ("plan_id".to_string(), Value::String(plan.id.to_string())),
            ("counts".to_string(), serde_json::to_value(counts).unwrap_or(Value::Null)),
        ]);
        memory.add_message_with_metadata(Role::Assistant, summary.clone(), metadata);
        tracing::info!(plan_id = %plan.id, summary = %summary, "plan finished");

        plan.actions()
            .iter()
            .map(|a| StepResult {
                step: a.step_number,
                action: a.action,
                description: a.description.clone(),
                status: a.status(),
                message: a.result_message.clone().unwrap_or_default(),
                data: data.remove(&a.step_number),
            })
            .collect()
    }

    /// 按标签分发；提供者缺失或返回错误都记为失败
    async fn dispatch(&self, intent: &Intent) -> ActionOutcome {
        let tag = intent.action.as_str();
        let start = Instant::now();
        let outcome = match self.registry.get(tag) {
            Some(provider) => match provider.execute(intent).await {
                Ok(outcome) => outcome,
                Err(e) => ActionOutcome::failure(e.to_string()),
            },
            None => ActionOutcome::failure(AgentError::UnregisteredAction(tag.to_string()).to_string()),
        };

        let audit = serde_json::json!({
            "event": "action_audit",
            "action": tag,
            "ok": outcome.success,
            "duration_ms": start.elapsed().as_millis() as u64,
            "params": params_preview(intent),
            "message": preview(&outcome.message),
        });
        tracing::info!(audit = %audit.to_string(), "action");
        outcome
    }

    fn record_state(&self, memory: &mut ConversationMemory, intent: &Intent, outcome: &ActionOutcome) {
        if !outcome.state.is_empty() {
            memory.update_state(outcome.state.clone());
        }
        let mut update = StateUpdate::new().last_action(
            intent.action.as_str(),
            outcome.success,
            preview(&outcome.message),
        );
        if outcome.success {
            if let Some(project) = intent.project() {
                update = update.active_project(project);
            }
        }
        memory.update_state(update);
    }
}

fn log_plan_error(result: Result<(), PlanError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "plan status update rejected");
    }
}

fn params_preview(intent: &Intent) -> String {
    let s = serde_json::to_string(&intent.params).unwrap_or_default();
    preview(&s)
}

fn preview(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}

/// 终局摘要
pub fn format_summary(counts: &PlanCounts) -> String {
    if counts.total > 0 && counts.completed == counts.total {
        let noun = if counts.total == 1 { "step" } else { "steps" };
        return format!("Plan finished: all {} {noun} completed.", counts.total);
    }
    format!(
        "Plan finished: {} completed, {} failed, {} skipped (of {}).",
        counts.completed, counts.failed, counts.skipped, counts.total
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionProvider;
    use crate::intent::ParamMap;
    use crate::plan::PlannedAction;
    use crate::ui::ScriptedConsole;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        tag: &'static str,
        succeed: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ActionProvider for Counting {
        fn tag(&self) -> &str {
            self.tag
        }

        async fn execute(&self, _intent: &Intent) -> Result<ActionOutcome, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(ActionOutcome::success("ok")
                    .with_data(json!({"run": 7}))
                    .with_state(StateUpdate::new().last_run_number(7)))
            } else {
                Ok(ActionOutcome::failure("boom"))
            }
        }
    }

    fn project(name: &str) -> ParamMap {
        [("project".to_string(), json!(name))].into_iter().collect()
    }

    fn setup(
        run_ok: bool,
        answers: &[&str],
    ) -> (ActionExecutor, Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<ScriptedConsole>) {
        let run_calls = Arc::new(AtomicUsize::new(0));
        let export_calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ActionRegistry::new();
        registry.register(Counting { tag: "run_tests", succeed: run_ok, calls: run_calls.clone() });
        registry.register(Counting { tag: "export_report", succeed: true, calls: export_calls.clone() });
        let console = Arc::new(ScriptedConsole::new(answers.iter().copied()));
        let gate = Arc::new(ConfirmationGate::new(console.clone()));
        (ActionExecutor::new(registry, gate), run_calls, export_calls, console)
    }

    fn plan(with_dependency: bool) -> ExecutionPlan {
        ExecutionPlan::new(
            "run then export",
            vec![
                PlannedAction::new(1, ActionKind::RunTests, project("acme"), None),
                PlannedAction::new(2, ActionKind::ExportReport, project("acme"), with_dependency.then_some(1)),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_all_steps_complete_and_state_is_merged() {
        let (executor, run_calls, export_calls, _) = setup(true, &[]);
        let mut plan = plan(true);
        let mut memory = ConversationMemory::new(20);
        let results = executor.execute_plan(&mut plan, &mut memory).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(StepResult::succeeded));
        assert_eq!(results[0].data, Some(json!({"run": 7})));
        assert_eq!(run_calls.load(Ordering::SeqCst), 1);
        assert_eq!(export_calls.load(Ordering::SeqCst), 1);
        assert_eq!(memory.state().last_run_number, Some(7));
        assert_eq!(memory.state().active_project.as_deref(), Some("acme"));
        assert_eq!(memory.state().last_action.as_deref(), Some("export_report"));
        assert_eq!(memory.last_assistant_message(), Some("Plan finished: all 2 steps completed."));

        let summary_turn = memory.turns().last().unwrap();
        assert_eq!(summary_turn.metadata()["plan_id"], json!(plan.id.to_string()));
        assert_eq!(summary_turn.metadata()["counts"]["completed"], json!(2));
    }

    #[tokio::test]
    async fn test_unmet_dependency_skips_without_prompt() {
        // 第 1 步失败后选择继续，第 2 步因依赖未完成被跳过
        let (executor, _, export_calls, console) = setup(false, &["c"]);
        let mut plan = plan(true);
        let mut memory = ConversationMemory::new(20);
        let results = executor.execute_plan(&mut plan, &mut memory).await;

        assert_eq!(results[0].status, ActionStatus::Failed);
        assert_eq!(results[1].status, ActionStatus::Skipped);
        assert_eq!(results[1].message, DEPENDENCY_NOT_SATISFIED);
        assert_eq!(export_calls.load(Ordering::SeqCst), 0);
        assert_eq!(console.prompts().len(), 1);
        assert_eq!(memory.state().last_action_success, Some(false));
        assert!(memory.state().active_project.is_none());
    }

    #[tokio::test]
    async fn test_declining_continue_cancels_remaining() {
        let (executor, _, export_calls, _) = setup(false, &["a"]);
        let mut plan = plan(false);
        let mut memory = ConversationMemory::new(20);
        let results = executor.execute_plan(&mut plan, &mut memory).await;

        assert_eq!(results[1].status, ActionStatus::Skipped);
        assert_eq!(results[1].message, CANCELLED_AFTER_FAILURE);
        assert_eq!(export_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            memory.last_assistant_message(),
            Some("Plan finished: 0 completed, 1 failed, 1 skipped (of 2).")
        );
    }

    #[tokio::test]
    async fn test_accepting_continue_runs_independent_step() {
        let (executor, _, export_calls, _) = setup(false, &["c"]);
        let mut plan = plan(false);
        let mut memory = ConversationMemory::new(20);
        let results = executor.execute_plan(&mut plan, &mut memory).await;
        assert_eq!(results[1].status, ActionStatus::Completed);
        assert_eq!(export_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unregistered_tag_fails_its_step() {
        let (executor, _, _, _) = setup(true, &[]);
        let mut plan = ExecutionPlan::new(
            "flaky",
            vec![PlannedAction::new(1, ActionKind::DetectFlaky, project("acme"), None)],
        )
        .unwrap();
        let mut memory = ConversationMemory::new(20);
        let results = executor.execute_plan(&mut plan, &mut memory).await;
        assert_eq!(results[0].status, ActionStatus::Failed);
        assert!(results[0].message.contains("detect_flaky"));
    }
}
