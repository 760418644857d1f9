//! IntentParser：两级解析
//!
//! - Tier A（parse_plan）：模型输出整份计划文档，解码后逐步校验（标签、步骤编号、依赖、参数类型、项目名）。
//!   任一校验失败返回 ParseError，由上层回退到 Tier B。
//! - Tier B（parse_intent）：模型输出单个动作的扁平 JSON；失败时返回 action = Unknown 并附带原因，不返回错误。
//!
//! 两级共用 extract_json_block 与 normalize_params，解码逻辑是纯函数（decode_plan / decode_intent），便于测试。

use std::collections::BTreeMap;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::intent::catalog::{ActionKind, RESOURCE_PARAM};
use crate::intent::extract::extract_json_block;
use crate::intent::intent::{Intent, ParamMap};
use crate::intent::prompts;
use crate::llm::LlmClient;

/// 计划文档（Tier A 模型输出格式，同时用于生成 JSON Schema）
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlanDocument {
    /// 请求是否与可用动作相关
    #[serde(default = "default_true")]
    pub understood: bool,
    /// 无法确定项目或动作时为 true，并给出 clarification_question
    #[serde(default)]
    pub needs_clarification: bool,
    #[serde(default)]
    pub clarification_question: Option<String>,
    /// 一句话概括用户目标
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub actions: Vec<PlanStepDocument>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlanStepDocument {
    /// 从 1 开始连续编号
    #[serde(default)]
    #[schemars(with = "Option<u32>")]
    pub step: Option<Value>,
    /// 动作标签，取自 AVAILABLE ACTIONS
    pub action: String,
    #[serde(default)]
    pub parameters: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub description: Option<String>,
    /// 只能引用更早的步骤
    #[serde(default)]
    #[schemars(with = "Option<u32>")]
    pub depends_on: Option<Value>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("the language model did not respond")]
    NoResponse,

    #[error("model response did not contain a JSON object")]
    NoJson,

    #[error("invalid model response: {0}")]
    Decode(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("step at position {position} is numbered {found}")]
    StepNumbering { position: usize, found: String },

    #[error("step {step} depends on invalid step {depends_on}")]
    Dependency { step: u32, depends_on: String },

    #[error("parameter '{param}' of {action}: {reason}")]
    Parameter {
        action: ActionKind,
        param: String,
        reason: String,
    },

    #[error("Unknown project '{name}'. Available: {}", available_list(.available))]
    UnknownProject { name: String, available: Vec<String> },
}

fn available_list(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}

/// 校验通过的一步
#[derive(Debug, Clone, PartialEq)]
pub struct DraftStep {
    pub step: u32,
    pub action: ActionKind,
    pub params: ParamMap,
    pub depends_on: Option<u32>,
}

/// Tier A 解码结果
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Steps { goal: String, steps: Vec<DraftStep> },
    Clarify { goal: String, question: String },
    NotUnderstood { goal: String },
}

pub struct IntentParser {
    llm: Arc<dyn LlmClient>,
}

impl IntentParser {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    /// Tier A：整份计划
    pub async fn parse_plan(
        &self,
        input: &str,
        context: &str,
        projects: &[String],
    ) -> Result<PlanOutcome, ParseError> {
        let prompt = prompts::build_prompt(input, context, projects);
        let raw = self
            .llm
            .generate(&prompt, &prompts::plan_instructions())
            .await
            .filter(|t| !t.trim().is_empty())
            .ok_or(ParseError::NoResponse)?;
        tracing::debug!(len = raw.len(), "Tier A response received");
        decode_plan(&raw, input, projects)
    }

    /// Tier B：单个意图
    pub async fn parse_intent(&self, input: &str, context: &str, projects: &[String]) -> Intent {
        let prompt = prompts::build_prompt(input, context, projects);
        let reply = self
            .llm
            .generate(&prompt, &prompts::intent_instructions())
            .await
            .filter(|t| !t.trim().is_empty());
        match reply {
            Some(raw) => {
                tracing::debug!(len = raw.len(), "Tier B response received");
                decode_intent(&raw, input, projects)
            }
            None => Intent::unknown(input, ParseError::NoResponse.to_string()),
        }
    }
}

/// 解码并校验 Tier A 计划文档
pub fn decode_plan(raw: &str, input: &str, projects: &[String]) -> Result<PlanOutcome, ParseError> {
    let block = extract_json_block(raw).ok_or(ParseError::NoJson)?;
    let doc: PlanDocument =
        serde_json::from_str(block).map_err(|e| ParseError::Decode(e.to_string()))?;

    let goal = doc
        .goal
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .unwrap_or(input)
        .to_string();

    if doc.needs_clarification {
        let question = doc
            .clarification_question
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| "Could you be more specific?".to_string());
        return Ok(PlanOutcome::Clarify { goal, question });
    }
    if !doc.understood || doc.actions.is_empty() {
        return Ok(PlanOutcome::NotUnderstood { goal });
    }

    let explicit_numbers = doc.actions.iter().any(|a| a.step.is_some());
    let mut steps = Vec::with_capacity(doc.actions.len());
    for (idx, entry) in doc.actions.into_iter().enumerate() {
        let expected = idx as u32 + 1;
        let step = if explicit_numbers {
            match entry.step.as_ref().and_then(as_u32) {
                Some(n) if n == expected => n,
                _ => {
                    return Err(ParseError::StepNumbering {
                        position: idx + 1,
                        found: entry
                            .step
                            .as_ref()
                            .map(Value::to_string)
                            .unwrap_or_else(|| "nothing".to_string()),
                    })
                }
            }
        } else {
            expected
        };

        let action = ActionKind::parse(&entry.action)
            .ok_or_else(|| ParseError::UnknownAction(entry.action.clone()))?;

        let depends_on = match entry.depends_on {
            None | Some(Value::Null) => None,
            Some(v) => match as_u32(&v) {
                Some(0) => None,
                Some(d) if d < step => Some(d),
                _ => {
                    return Err(ParseError::Dependency {
                        step,
                        depends_on: v.to_string(),
                    })
                }
            },
        };

        let params = normalize_params(action, entry.parameters.unwrap_or_default(), projects)?;
        steps.push(DraftStep {
            step,
            action,
            params,
            depends_on,
        });
    }
    Ok(PlanOutcome::Steps { goal, steps })
}

/// 解码 Tier B 扁平 JSON；失败时返回 Unknown 意图并附带原因
pub fn decode_intent(raw: &str, input: &str, projects: &[String]) -> Intent {
    let Some(block) = extract_json_block(raw) else {
        return Intent::unknown(input, ParseError::NoJson.to_string());
    };
    let mut map: Map<String, Value> = match serde_json::from_str(block) {
        Ok(m) => m,
        Err(e) => return Intent::unknown(input, ParseError::Decode(e.to_string()).to_string()),
    };

    let tag = map
        .remove("action")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let confidence = map
        .remove("confidence")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.5) as f32;

    let action = match ActionKind::parse(&tag) {
        Some(a) => a,
        None if tag.is_empty() || tag.eq_ignore_ascii_case("unknown") => {
            return Intent::unknown(input, "Request not understood")
        }
        None => return Intent::unknown(input, ParseError::UnknownAction(tag).to_string()),
    };

    let mut raw_params: BTreeMap<String, Value> = BTreeMap::new();
    if let Some(Value::Object(nested)) = map.remove("parameters") {
        raw_params.extend(nested);
    }
    raw_params.extend(map);

    match normalize_params(action, raw_params, projects) {
        Ok(params) => Intent::new(action, params)
            .with_raw_text(input)
            .with_confidence(confidence),
        Err(e) => Intent::unknown(input, e.to_string()),
    }
}

/// 按目录规范化参数：丢弃未声明的键、类型归一、项目名规范化、补默认值
pub fn normalize_params(
    action: ActionKind,
    raw: impl IntoIterator<Item = (String, Value)>,
    projects: &[String],
) -> Result<ParamMap, ParseError> {
    let mut out = ParamMap::new();
    let Some(spec) = action.spec() else {
        return Ok(out);
    };
    for (key, value) in raw {
        let Some(param) = spec.param(&key) else {
            tracing::debug!(action = %action, param = %key, "dropping undeclared parameter");
            continue;
        };
        let coerced = param.coerce(&value).map_err(|reason| ParseError::Parameter {
            action,
            param: key.clone(),
            reason,
        })?;
        let Some(mut coerced) = coerced else {
            continue;
        };
        if key == RESOURCE_PARAM {
            let name = coerced.as_str().unwrap_or_default().to_string();
            let canonical = canonical_project(&name, projects).ok_or_else(|| {
                ParseError::UnknownProject {
                    name: name.clone(),
                    available: projects.to_vec(),
                }
            })?;
            coerced = Value::String(canonical);
        }
        out.insert(key, coerced);
    }
    for param in spec.params {
        if !out.contains_key(param.name) {
            if let Some(default) = param.default_value() {
                out.insert(param.name.to_string(), default);
            }
        }
    }
    Ok(out)
}

/// 在可用项目中查找（大小写不敏感），返回目录中的规范名称
pub fn canonical_project(name: &str, projects: &[String]) -> Option<String> {
    let name = name.trim();
    projects
        .iter()
        .find(|p| p.as_str() == name)
        .or_else(|| projects.iter().find(|p| p.eq_ignore_ascii_case(name)))
        .cloned()
}

fn as_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn projects() -> Vec<String> {
        vec!["acme".to_string(), "beta".to_string()]
    }

    #[test]
    fn test_decode_two_step_plan() {
        let raw = r#"{"goal": "run and export", "actions": [
            {"step": 1, "action": "run_tests", "parameters": {"project": "ACME", "mode": "auto"}},
            {"step": 2, "action": "export_report", "parameters": {"project": "acme", "export_format": "html"}, "depends_on": 1}
        ]}"#;
        let PlanOutcome::Steps { goal, steps } = decode_plan(raw, "x", &projects()).unwrap() else {
            panic!("expected steps");
        };
        assert_eq!(goal, "run and export");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].params["project"], json!("acme"));
        assert_eq!(steps[0].params["test_filter"], json!("pending"));
        assert_eq!(steps[1].depends_on, Some(1));
    }

    #[test]
    fn test_missing_step_numbers_are_assigned() {
        let raw = r#"{"actions": [{"action": "list_projects"}, {"action": "help"}]}"#;
        let PlanOutcome::Steps { goal, steps } = decode_plan(raw, "what can you do", &[]).unwrap() else {
            panic!("expected steps");
        };
        assert_eq!(goal, "what can you do");
        assert_eq!(steps.iter().map(|s| s.step).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_bad_numbering_is_rejected() {
        let raw = r#"{"actions": [{"step": 1, "action": "help"}, {"step": 3, "action": "help"}]}"#;
        assert!(matches!(
            decode_plan(raw, "x", &[]),
            Err(ParseError::StepNumbering { position: 2, .. })
        ));
    }

    #[test]
    fn test_forward_dependency_is_rejected() {
        let raw = r#"{"actions": [{"step": 1, "action": "help", "depends_on": 2}, {"step": 2, "action": "help"}]}"#;
        assert!(matches!(
            decode_plan(raw, "x", &[]),
            Err(ParseError::Dependency { step: 1, .. })
        ));
    }

    #[test]
    fn test_unknown_tag_and_unknown_project() {
        let raw = r#"{"actions": [{"action": "deploy"}]}"#;
        assert_eq!(
            decode_plan(raw, "x", &projects()),
            Err(ParseError::UnknownAction("deploy".into()))
        );
        let raw = r#"{"actions": [{"action": "detect_flaky", "parameters": {"project": "zeta"}}]}"#;
        let err = decode_plan(raw, "x", &projects()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown project 'zeta'. Available: acme, beta");
    }

    #[test]
    fn test_clarification_and_not_understood() {
        let raw = r#"{"needs_clarification": true, "clarification_question": "Which project?", "actions": []}"#;
        assert_eq!(
            decode_plan(raw, "run tests", &projects()).unwrap(),
            PlanOutcome::Clarify {
                goal: "run tests".into(),
                question: "Which project?".into()
            }
        );
        let raw = r#"{"understood": false, "actions": []}"#;
        assert!(matches!(
            decode_plan(raw, "weather?", &projects()).unwrap(),
            PlanOutcome::NotUnderstood { .. }
        ));
    }

    #[test]
    fn test_create_project_name_skips_catalog_check() {
        let raw = r#"{"actions": [{"step": 1, "action": "create_project", "parameters": {"name": "gamma"}}]}"#;
        match decode_plan(raw, "create a project called gamma", &projects()).unwrap() {
            PlanOutcome::Steps { steps, .. } => {
                assert_eq!(steps[0].action, ActionKind::CreateProject);
                assert_eq!(steps[0].params["name"], json!("gamma"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_decode_intent_flat_and_nested() {
        let intent = decode_intent(
            "```json\n{\"action\": \"show_status\", \"project\": \"beta\", \"run_number\": \"4\", \"confidence\": 0.8}\n```",
            "status of beta run 4",
            &projects(),
        );
        assert_eq!(intent.action, ActionKind::ShowStatus);
        assert_eq!(intent.param_i64("run_number"), Some(4));
        assert!((intent.confidence - 0.8).abs() < 1e-6);

        let intent = decode_intent(
            r#"{"action": "export_report", "parameters": {"project": "acme"}}"#,
            "export",
            &projects(),
        );
        assert_eq!(intent.param_str("export_format"), Some("html"));
    }

    #[test]
    fn test_decode_intent_failures_become_unknown() {
        let intent = decode_intent("no json here", "hi", &projects());
        assert!(intent.is_unknown());
        assert!(intent.error.is_some());

        let intent = decode_intent(r#"{"action": "unknown"}"#, "hi", &projects());
        assert_eq!(intent.error.as_deref(), Some("Request not understood"));

        let intent = decode_intent(r#"{"action": "run_tests", "mode": "turbo"}"#, "hi", &projects());
        assert!(intent.is_unknown());
    }
}
