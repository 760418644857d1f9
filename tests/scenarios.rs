//! 端到端场景：MockLlmClient + ScriptedConsole + 记录调用的提供者

use std::sync::{Arc, Mutex};

use agent_pilot::actions::{
    ActionOutcome, ActionProvider, ActionRegistry, CANCELLED_AFTER_FAILURE, DEPENDENCY_NOT_SATISFIED,
};
use agent_pilot::config::AppConfig;
use agent_pilot::core::{AgentError, CANCELLED};
use agent_pilot::intent::{ActionKind, Intent};
use agent_pilot::llm::MockLlmClient;
use agent_pilot::memory::{ConversationMemory, StateUpdate};
use agent_pilot::plan::{ActionStatus, NOT_UNDERSTOOD, NO_RESPONSE};
use agent_pilot::providers::ListProjectsProvider;
use agent_pilot::resources::StaticCatalog;
use agent_pilot::ui::ScriptedConsole;
use agent_pilot::{AgentBuilder, AgentState, ConversationalAgent};
use async_trait::async_trait;
use serde_json::json;

type Calls = Arc<Mutex<Vec<Intent>>>;

struct Recording {
    tag: &'static str,
    succeed: bool,
    calls: Calls,
}

#[async_trait]
impl ActionProvider for Recording {
    fn tag(&self) -> &str {
        self.tag
    }

    async fn execute(&self, intent: &Intent) -> Result<ActionOutcome, AgentError> {
        self.calls.lock().unwrap().push(intent.clone());
        if self.succeed {
            Ok(ActionOutcome::success(format!("{} ok", self.tag))
                .with_state(StateUpdate::new().last_run_number(16)))
        } else {
            Ok(ActionOutcome::failure(format!("{} exploded", self.tag)))
        }
    }
}

struct Harness {
    agent: ConversationalAgent,
    llm: Arc<MockLlmClient>,
    console: Arc<ScriptedConsole>,
    calls: Calls,
}

impl Harness {
    fn calls_for(&self, tag: &str) -> Vec<Intent> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.action.as_str() == tag)
            .cloned()
            .collect()
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

fn harness(responses: &[&str], answers: &[&str], failing: &[&str]) -> Harness {
    let llm = Arc::new(MockLlmClient::with_responses(responses.iter().copied()));
    let console = Arc::new(ScriptedConsole::new(answers.iter().copied()));
    let catalog = Arc::new(StaticCatalog::new(["acme", "beta"]));
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));

    let mut registry = ActionRegistry::new();
    registry.register(ListProjectsProvider::new(catalog.clone()));
    for tag in ["run_tests", "export_report", "detect_flaky", "show_status"] {
        registry.register(Recording {
            tag,
            succeed: !failing.contains(&tag),
            calls: calls.clone(),
        });
    }

    let agent = AgentBuilder::new(AppConfig::default())
        .with_llm(llm.clone())
        .with_console(console.clone())
        .with_catalog(catalog)
        .with_registry(registry)
        .build()
        .unwrap();
    Harness {
        agent,
        llm,
        console,
        calls,
    }
}

const RUN_THEN_EXPORT: &str = r#"{"goal": "run tests on acme and export", "actions": [
    {"step": 1, "action": "run_tests", "parameters": {"project": "acme", "mode": "auto"}},
    {"step": 2, "action": "export_report", "parameters": {"project": "acme"}, "depends_on": 1}
]}"#;

#[tokio::test]
async fn scenario_a_list_projects_is_single_step() {
    let mut h = harness(&[r#"{"actions": [{"step": 1, "action": "list_projects"}]}"#], &["c"], &[]);
    let response = h.agent.process_input("list my projects").await;

    let plan = response.plan.as_ref().unwrap();
    assert!(!plan.needs_clarification);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.actions()[0].action, ActionKind::ListProjects);
    assert_eq!(response.message, "Available projects: acme, beta");
    assert_eq!(response.state, AgentState::Idle);
    assert_eq!(
        response.trace,
        vec![
            AgentState::Idle,
            AgentState::Understanding,
            AgentState::Planning,
            AgentState::Confirming,
            AgentState::Executing,
            AgentState::Reporting,
            AgentState::Idle,
        ]
    );
}

#[tokio::test]
async fn scenario_b_missing_project_asks_naming_candidates() {
    let mut h = harness(&[r#"{"actions": [{"action": "run_tests", "parameters": {"mode": "auto"}}]}"#], &[], &[]);
    let response = h.agent.process_input("run tests").await;

    assert!(response.needs_input);
    let plan = response.plan.as_ref().unwrap();
    assert!(plan.needs_clarification);
    assert!(plan.is_empty());
    let question = plan.clarification_question.as_deref().unwrap();
    assert!(question.contains("acme") && question.contains("beta"));
    assert_eq!(
        response.trace,
        vec![AgentState::Idle, AgentState::Understanding, AgentState::Planning, AgentState::Idle]
    );
    assert_eq!(h.total_calls(), 0);
    assert!(h.console.prompts().is_empty());
    assert_eq!(h.agent.memory().state().pending_clarification.as_deref(), Some(question));
}

#[tokio::test]
async fn scenario_b_active_project_resolves_reference() {
    let mut h = harness(&[r#"{"actions": [{"action": "run_tests"}]}"#], &["c"], &[]);
    h.agent
        .memory_mut()
        .update_state(StateUpdate::new().active_project("beta"));
    let response = h.agent.process_input("run tests").await;

    assert!(!response.needs_input);
    assert_eq!(h.calls_for("run_tests")[0].project(), Some("beta"));
}

#[tokio::test]
async fn scenario_c_run_then_export_depends_on_first_step() {
    let mut h = harness(&[RUN_THEN_EXPORT], &["c"], &[]);
    let response = h
        .agent
        .process_input("run tests on acme then export the results")
        .await;

    let plan = response.plan.as_ref().unwrap();
    assert_eq!(plan.len(), 2);
    let step1 = plan.get_action(1).unwrap();
    let step2 = plan.get_action(2).unwrap();
    assert_eq!(step1.action, ActionKind::RunTests);
    assert_eq!(step1.parameters["project"], json!("acme"));
    assert_eq!(step2.action, ActionKind::ExportReport);
    assert_eq!(step2.depends_on, Some(1));
    assert!(response.results.iter().all(|r| r.status == ActionStatus::Completed));
    assert_eq!(h.agent.memory().state().last_run_number, Some(16));
    assert_eq!(h.agent.memory().state().active_project.as_deref(), Some("acme"));
}

#[tokio::test]
async fn scenario_d_declined_continue_skips_step_two() {
    let mut h = harness(&[RUN_THEN_EXPORT], &["c", "a"], &["run_tests"]);
    let response = h.agent.process_input("run tests then export").await;

    let plan = response.plan.as_ref().unwrap();
    assert_eq!(plan.get_action(1).unwrap().status(), ActionStatus::Failed);
    assert_eq!(plan.get_action(2).unwrap().status(), ActionStatus::Skipped);
    assert!(h.calls_for("export_report").is_empty());
    assert_eq!(response.state, AgentState::Idle);
    assert!(response.message.contains("0 completed, 1 failed, 1 skipped (of 2)"));
}

#[tokio::test]
async fn accepted_continue_still_skips_unmet_dependency() {
    let mut h = harness(&[RUN_THEN_EXPORT], &["c", "c"], &["run_tests"]);
    let response = h.agent.process_input("run tests then export").await;

    assert_eq!(response.results[1].status, ActionStatus::Skipped);
    assert_eq!(response.results[1].message, DEPENDENCY_NOT_SATISFIED);
    assert!(h.calls_for("export_report").is_empty());
}

#[tokio::test]
async fn scenario_e_fenced_response_is_extracted() {
    let fenced = "Sure, here is the plan:\n```json\n{\"actions\": [{\"step\": 1, \"action\": \"detect_flaky\", \"parameters\": {\"project\": \"beta\"}}]}\n```\nAnything else?";
    let mut h = harness(&[fenced], &["c"], &[]);
    let response = h.agent.process_input("find flaky tests in beta").await;

    assert!(!response.needs_input);
    assert_eq!(h.calls_for("detect_flaky").len(), 1);
    assert_eq!(h.llm.call_count(), 1);
}

#[test]
fn scenario_f_evicted_turns_leave_state_intact() {
    let mut memory = ConversationMemory::new(20);
    memory.update_state(StateUpdate::new().active_project("acme"));
    for i in 1..=25 {
        memory.add_user_message(format!("turn-{i:02}"));
    }
    let context = memory.get_context_for_llm(true);

    for i in 1..=5 {
        assert!(!context.contains(&format!("turn-{i:02}")));
    }
    assert!(context.contains("turn-25"));
    assert!(context.contains("Active project: acme"));
    assert_eq!(memory.len(), 20);
}

#[tokio::test]
async fn zero_actions_is_not_understood() {
    for reply in [r#"{"actions": []}"#, r#"{"understood": false, "actions": []}"#] {
        let mut h = harness(&[reply], &[], &[]);
        let response = h.agent.process_input("what's the weather").await;
        assert!(response.needs_input);
        assert_eq!(response.message, NOT_UNDERSTOOD);
        assert_eq!(h.total_calls(), 0);
        assert_eq!(h.llm.call_count(), 1);
    }
}

#[tokio::test]
async fn step_numbers_are_contiguous() {
    let reply = r#"{"actions": [
        {"action": "show_status", "parameters": {"project": "acme"}},
        {"action": "detect_flaky", "parameters": {"project": "acme"}},
        {"action": "list_projects"}
    ]}"#;
    let mut h = harness(&[reply], &["c"], &[]);
    let response = h.agent.process_input("status, flaky, projects").await;
    let steps: Vec<u32> = response
        .plan
        .as_ref()
        .unwrap()
        .actions()
        .iter()
        .map(|a| a.step_number)
        .collect();
    assert_eq!(steps, vec![1, 2, 3]);
}

#[tokio::test]
async fn cancel_after_failure_skips_every_later_step() {
    let reply = r#"{"actions": [
        {"step": 1, "action": "run_tests", "parameters": {"project": "acme"}},
        {"step": 2, "action": "detect_flaky", "parameters": {"project": "acme"}},
        {"step": 3, "action": "show_status", "parameters": {"project": "acme"}}
    ]}"#;
    let mut h = harness(&[reply], &["c", "no"], &["run_tests"]);
    let response = h.agent.process_input("run, flaky, status").await;

    for result in &response.results[1..] {
        assert_eq!(result.status, ActionStatus::Skipped);
        assert_eq!(result.message, CANCELLED_AFTER_FAILURE);
    }
    assert_eq!(h.total_calls(), 1);
}

#[tokio::test]
async fn tier_b_fallback_wraps_single_intent() {
    let mut h = harness(
        &[
            r#"{"actions": [{"step": 2, "action": "run_tests"}]}"#,
            r#"{"action": "show_status", "project": "beta", "confidence": 0.7}"#,
        ],
        &["c"],
        &[],
    );
    let response = h.agent.process_input("how is beta doing").await;
    let plan = response.plan.as_ref().unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.actions()[0].action, ActionKind::ShowStatus);
    assert_eq!(plan.actions()[0].description, "Show status of beta");
    assert_eq!(h.llm.call_count(), 2);
}

#[tokio::test]
async fn unknown_project_in_both_tiers_is_reported() {
    let mut h = harness(
        &[
            r#"{"actions": [{"action": "detect_flaky", "parameters": {"project": "zeta"}}]}"#,
            r#"{"action": "detect_flaky", "project": "zeta"}"#,
        ],
        &[],
        &[],
    );
    let response = h.agent.process_input("flaky tests in zeta").await;
    assert!(response.needs_input);
    assert!(response.message.starts_with("Unknown project 'zeta'. Available: acme, beta."));
    assert_eq!(h.total_calls(), 0);
}

#[tokio::test]
async fn silent_provider_returns_immediately() {
    let mut h = harness(&[], &[], &[]);
    let response = h.agent.process_input("run tests on acme").await;
    assert!(response.needs_input);
    assert_eq!(response.message, NO_RESPONSE);
    assert_eq!(h.llm.call_count(), 1);
}

#[tokio::test]
async fn abort_at_confirmation_executes_nothing() {
    let mut h = harness(&[RUN_THEN_EXPORT], &["a"], &[]);
    let response = h.agent.process_input("run then export").await;
    assert_eq!(response.message, CANCELLED);
    assert_eq!(h.total_calls(), 0);
    assert_eq!(
        response.trace,
        vec![
            AgentState::Idle,
            AgentState::Understanding,
            AgentState::Planning,
            AgentState::Confirming,
            AgentState::Idle
        ]
    );
}

#[tokio::test]
async fn eof_at_confirmation_aborts() {
    let mut h = harness(&[r#"{"actions": [{"action": "detect_flaky", "parameters": {"project": "acme"}}]}"#], &[], &[]);
    let response = h.agent.process_input("flaky").await;
    assert_eq!(response.message, CANCELLED);
    assert_eq!(h.total_calls(), 0);
}

#[tokio::test]
async fn modified_parameters_reach_the_provider() {
    let reply = r#"{"actions": [{"action": "run_tests", "parameters": {"project": "acme"}}]}"#;
    // m, 然后依次编辑 project / mode / test_filter / cloud / new_run
    let mut h = harness(&[reply], &["m", "beta", "", "", "yes", ""], &[]);
    let response = h.agent.process_input("run tests on acme").await;

    let calls = h.calls_for("run_tests");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].project(), Some("beta"));
    assert!(calls[0].param_bool("cloud"));
    let plan = response.plan.as_ref().unwrap();
    assert_eq!(plan.actions()[0].description, "Run tests on beta (mode auto, cloud)");
}

#[tokio::test]
async fn repeated_utterances_are_independent_requests() {
    let reply = r#"{"actions": [{"action": "detect_flaky", "parameters": {"project": "acme"}}]}"#;
    let mut h = harness(&[reply, reply], &["c", "c"], &[]);
    h.agent.process_input("find flaky tests in acme").await;
    h.agent.process_input("find flaky tests in acme").await;
    assert_eq!(h.calls_for("detect_flaky").len(), 2);
    assert_eq!(h.llm.call_count(), 2);
}

#[tokio::test]
async fn context_reaches_the_model_on_follow_up() {
    let mut h = harness(
        &[
            r#"{"actions": [{"action": "run_tests", "parameters": {"project": "acme"}}]}"#,
            r#"{"actions": [{"action": "export_report", "parameters": {"export_format": "pdf"}}]}"#,
        ],
        &["c", "c"],
        &[],
    );
    h.agent.process_input("run tests on acme").await;
    h.agent.process_input("now export the pdf").await;

    let second_prompt = &h.llm.calls()[1].prompt;
    assert!(second_prompt.contains("Active project: acme"));
    assert!(second_prompt.contains("user: run tests on acme"));
    let export = h.calls_for("export_report");
    assert_eq!(export[0].project(), Some("acme"));
    assert_eq!(export[0].param_str("export_format"), Some("pdf"));
}

#[test]
fn memory_capacity_and_idempotent_context() {
    let cap = 7;
    let mut memory = ConversationMemory::new(cap);
    for k in 1..=20usize {
        memory.add_assistant_message(format!("m{k}"));
        assert_eq!(memory.len(), k.min(cap));
        let retained: Vec<&str> = memory.turns().iter().map(|t| t.content()).collect();
        let expected: Vec<String> = ((k.saturating_sub(cap) + 1)..=k).map(|i| format!("m{i}")).collect();
        assert_eq!(retained, expected);
        assert_eq!(memory.get_context_for_llm(true), memory.get_context_for_llm(true));
    }
}

#[tokio::test]
async fn empty_input_stays_idle() {
    let mut h = harness(&[], &[], &[]);
    let response = h.agent.process_input("   ").await;
    assert!(response.needs_input);
    assert_eq!(response.state, AgentState::Idle);
    assert_eq!(h.llm.call_count(), 0);
    assert!(h.agent.memory().is_empty());
}
