//! 动作目录：封闭的动作标签集合及其参数定义
//!
//! 目录同时服务于三处：Tier A/B 提示词中的动作说明、解码后的参数类型校验、确认界面的可选值。
//! 目录本身不包含任何动作实现；实现由 ActionRegistry 中注册的 ActionProvider 按标签提供。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 代表「资源」（项目）的参数名
pub const RESOURCE_PARAM: &str = "project";

/// 动作标签
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    RunTests,
    ExportReport,
    CompareRuns,
    ShowStatus,
    ListProjects,
    CreateProject,
    ShowRegressions,
    DetectFlaky,
    HealthCheck,
    ShowPerformance,
    CancelPipeline,
    Help,
    Unknown,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::RunTests => "run_tests",
            ActionKind::ExportReport => "export_report",
            ActionKind::CompareRuns => "compare_runs",
            ActionKind::ShowStatus => "show_status",
            ActionKind::ListProjects => "list_projects",
            ActionKind::CreateProject => "create_project",
            ActionKind::ShowRegressions => "show_regressions",
            ActionKind::DetectFlaky => "detect_flaky",
            ActionKind::HealthCheck => "health_check",
            ActionKind::ShowPerformance => "show_performance",
            ActionKind::CancelPipeline => "cancel_pipeline",
            ActionKind::Help => "help",
            ActionKind::Unknown => "unknown",
        }
    }

    /// 解析标签；大小写与 '-' / '_' 不敏感。未知标签（包括 "unknown" 本身）返回 None
    pub fn parse(tag: &str) -> Option<ActionKind> {
        let normalized = tag.trim().to_lowercase().replace(['-', ' '], "_");
        CATALOG
            .iter()
            .map(|spec| spec.kind)
            .find(|kind| kind.as_str() == normalized)
    }

    /// 面向用户的名称
    pub fn display_name(&self) -> &'static str {
        match self {
            ActionKind::RunTests => "Run tests",
            ActionKind::ExportReport => "Export report",
            ActionKind::CompareRuns => "Compare runs",
            ActionKind::ShowStatus => "Show status",
            ActionKind::ListProjects => "List projects",
            ActionKind::CreateProject => "Create project",
            ActionKind::ShowRegressions => "Show regressions",
            ActionKind::DetectFlaky => "Detect flaky tests",
            ActionKind::HealthCheck => "Health check",
            ActionKind::ShowPerformance => "Show performance",
            ActionKind::CancelPipeline => "Cancel pipeline",
            ActionKind::Help => "Help",
            ActionKind::Unknown => "Unknown",
        }
    }

    pub fn spec(&self) -> Option<&'static ActionSpec> {
        CATALOG.iter().find(|s| s.kind == *self)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 参数类型
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Text,
    /// 封闭取值集合
    Choice(&'static [&'static str]),
    Integer,
    Flag,
    /// 字符串列表（也接受逗号分隔的字符串）
    List,
}

impl ParamType {
    fn describe(&self) -> String {
        match self {
            ParamType::Text => "text".to_string(),
            ParamType::Choice(values) => format!("one of {}", values.join("|")),
            ParamType::Integer => "integer".to_string(),
            ParamType::Flag => "boolean".to_string(),
            ParamType::List => "list of text".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ParamType,
    pub required: bool,
    pub default: Option<&'static str>,
    pub help: &'static str,
}

impl ParamSpec {
    const fn new(name: &'static str, ty: ParamType, help: &'static str) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: None,
            help,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn default(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    pub fn default_value(&self) -> Option<Value> {
        let raw = self.default?;
        match self.ty {
            ParamType::Flag => Some(Value::Bool(raw == "true")),
            ParamType::Integer => raw.parse::<i64>().ok().map(Value::from),
            _ => Some(Value::String(raw.to_string())),
        }
    }

    /// 把模型给出的值规范化为目录声明的类型；Ok(None) 表示视同未给出
    pub fn coerce(&self, value: &Value) -> Result<Option<Value>, String> {
        match value {
            Value::Null => return Ok(None),
            Value::String(s) if s.trim().is_empty() || s.trim().eq_ignore_ascii_case("null") => {
                return Ok(None)
            }
            _ => {}
        }
        match self.ty {
            ParamType::Text => match value {
                Value::String(s) => Ok(Some(Value::String(s.trim().to_string()))),
                Value::Number(n) => Ok(Some(Value::String(n.to_string()))),
                other => Err(format!("expects text, got {other}")),
            },
            ParamType::Choice(allowed) => {
                let raw = match value {
                    Value::String(s) => s.trim().to_lowercase(),
                    other => return Err(format!("expects one of {}, got {other}", allowed.join("|"))),
                };
                if allowed.contains(&raw.as_str()) {
                    Ok(Some(Value::String(raw)))
                } else {
                    Err(format!("expects one of {}, got '{raw}'", allowed.join("|")))
                }
            }
            ParamType::Integer => match value {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                    .map(|i| Some(Value::from(i)))
                    .ok_or_else(|| format!("expects an integer, got {n}")),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(|i| Some(Value::from(i)))
                    .map_err(|_| format!("expects an integer, got '{s}'")),
                other => Err(format!("expects an integer, got {other}")),
            },
            ParamType::Flag => match value {
                Value::Bool(b) => Ok(Some(Value::Bool(*b))),
                Value::String(s) => parse_flag_word(s)
                    .map(|b| Some(Value::Bool(b)))
                    .ok_or_else(|| format!("expects true/false, got '{s}'")),
                Value::Number(n) if n.as_i64() == Some(0) || n.as_i64() == Some(1) => {
                    Ok(Some(Value::Bool(n.as_i64() == Some(1))))
                }
                other => Err(format!("expects true/false, got {other}")),
            },
            ParamType::List => match value {
                Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::String(s) if !s.trim().is_empty() => {
                                out.push(Value::String(s.trim().to_string()))
                            }
                            Value::Number(n) => out.push(Value::String(n.to_string())),
                            Value::String(_) | Value::Null => {}
                            other => return Err(format!("expects a list of text, got {other}")),
                        }
                    }
                    Ok((!out.is_empty()).then_some(Value::Array(out)))
                }
                Value::String(s) => {
                    let out: Vec<Value> = s
                        .split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(|p| Value::String(p.to_string()))
                        .collect();
                    Ok((!out.is_empty()).then_some(Value::Array(out)))
                }
                other => Err(format!("expects a list of text, got {other}")),
            },
        }
    }
}

/// 布尔词归一化（yes/no、true/false、1/0、si/no、on/off）
pub fn parse_flag_word(word: &str) -> Option<bool> {
    match word.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "si" | "sì" | "on" => Some(true),
        "false" | "no" | "n" | "0" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ActionSpec {
    pub kind: ActionKind,
    pub summary: &'static str,
    pub params: &'static [ParamSpec],
}

impl ActionSpec {
    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn required_params(&self) -> impl Iterator<Item = &'static ParamSpec> {
        self.params.iter().filter(|p| p.required)
    }
}

const MODES: &[&str] = &["train", "assisted", "auto"];
const TEST_FILTERS: &[&str] = &["all", "pending", "failed"];
const EXPORT_FORMATS: &[&str] = &["pdf", "excel", "html", "csv", "all"];

const PROJECT: ParamSpec = ParamSpec::new(RESOURCE_PARAM, ParamType::Text, "project name, from the available projects");
const RUN_NUMBER: ParamSpec = ParamSpec::new("run_number", ParamType::Integer, "run number (default: latest)");

const RUN_TESTS_PARAMS: &[ParamSpec] = &[
    PROJECT.required(),
    ParamSpec::new("mode", ParamType::Choice(MODES), "execution mode").default("auto"),
    ParamSpec::new("test_filter", ParamType::Choice(TEST_FILTERS), "which tests to run").default("pending"),
    ParamSpec::new("test_id", ParamType::Text, "a single test id, e.g. TEST_001"),
    ParamSpec::new("test_ids", ParamType::List, "several test ids"),
    ParamSpec::new("cloud", ParamType::Flag, "true to run in the remote CI environment").default("false"),
    ParamSpec::new("new_run", ParamType::Flag, "true to force a new run").default("false"),
    ParamSpec::new("single_turn", ParamType::Flag, "true to send only the initial question").default("false"),
    ParamSpec::new("test_limit", ParamType::Integer, "maximum number of tests"),
];

const EXPORT_PARAMS: &[ParamSpec] = &[
    PROJECT.required(),
    ParamSpec::new("export_format", ParamType::Choice(EXPORT_FORMATS), "report format").default("html"),
    RUN_NUMBER,
];

const COMPARE_PARAMS: &[ParamSpec] = &[
    PROJECT.required(),
    ParamSpec::new("run_a", ParamType::Integer, "first run number"),
    ParamSpec::new("run_b", ParamType::Integer, "second run number"),
];

const PROJECT_AND_RUN_REQUIRED: &[ParamSpec] = &[PROJECT.required(), RUN_NUMBER];
const PROJECT_REQUIRED: &[ParamSpec] = &[PROJECT.required()];
const PROJECT_AND_RUN: &[ParamSpec] = &[PROJECT, RUN_NUMBER];
const PROJECT_OPTIONAL: &[ParamSpec] = &[PROJECT];

// 新项目尚不在目录中，名称不走 project 参数的目录校验
const CREATE_PARAMS: &[ParamSpec] = &[ParamSpec::new("name", ParamType::Text, "name of the new project")];

/// 完整动作目录（不含 Unknown）
pub const CATALOG: &[ActionSpec] = &[
    ActionSpec { kind: ActionKind::RunTests, summary: "Run the tests of a project", params: RUN_TESTS_PARAMS },
    ActionSpec { kind: ActionKind::ExportReport, summary: "Export a report of a run", params: EXPORT_PARAMS },
    ActionSpec { kind: ActionKind::CompareRuns, summary: "Compare two runs", params: COMPARE_PARAMS },
    ActionSpec { kind: ActionKind::ShowRegressions, summary: "Show tests that regressed in a run", params: PROJECT_AND_RUN_REQUIRED },
    ActionSpec { kind: ActionKind::DetectFlaky, summary: "Detect flaky tests", params: PROJECT_REQUIRED },
    ActionSpec { kind: ActionKind::ShowStatus, summary: "Show project status and results", params: PROJECT_AND_RUN },
    ActionSpec { kind: ActionKind::ShowPerformance, summary: "Show performance metrics", params: PROJECT_AND_RUN },
    ActionSpec { kind: ActionKind::HealthCheck, summary: "Check that external services are reachable", params: PROJECT_OPTIONAL },
    ActionSpec { kind: ActionKind::CancelPipeline, summary: "Cancel a running remote pipeline", params: PROJECT_AND_RUN_REQUIRED },
    ActionSpec { kind: ActionKind::ListProjects, summary: "List the available projects", params: &[] },
    ActionSpec { kind: ActionKind::CreateProject, summary: "Create a new project", params: CREATE_PARAMS },
    ActionSpec { kind: ActionKind::Help, summary: "Show what the assistant can do", params: &[] },
];

/// 渲染目录供提示词使用
pub fn render_catalog() -> String {
    let mut out = String::new();
    for spec in CATALOG {
        out.push_str(&format!("- {}: {}\n", spec.kind.as_str(), spec.summary));
        if spec.params.is_empty() {
            out.push_str("    (no parameters)\n");
        }
        for p in spec.params {
            let mut attrs = vec![p.ty.describe()];
            attrs.push(if p.required { "REQUIRED".to_string() } else { "optional".to_string() });
            if let Some(d) = p.default {
                attrs.push(format!("default {d}"));
            }
            out.push_str(&format!("    {} ({}): {}\n", p.name, attrs.join(", "), p.help));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tags() {
        assert_eq!(ActionKind::parse("run_tests"), Some(ActionKind::RunTests));
        assert_eq!(ActionKind::parse("Run-Tests"), Some(ActionKind::RunTests));
        assert_eq!(ActionKind::parse("list projects"), Some(ActionKind::ListProjects));
        assert_eq!(ActionKind::parse("unknown"), None);
        assert_eq!(ActionKind::parse("deploy_prod"), None);
    }

    #[test]
    fn test_every_catalog_entry_round_trips_its_tag() {
        for spec in CATALOG {
            assert_eq!(ActionKind::parse(spec.kind.as_str()), Some(spec.kind));
        }
    }

    #[test]
    fn test_coerce_integer_from_string() {
        let p = ParamSpec::new("run_a", ParamType::Integer, "");
        assert_eq!(p.coerce(&json!("15")).unwrap(), Some(json!(15)));
        assert_eq!(p.coerce(&json!(16.0)).unwrap(), Some(json!(16)));
        assert!(p.coerce(&json!("latest")).is_err());
        assert_eq!(p.coerce(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_coerce_choice_rejects_outside_values() {
        let p = ParamSpec::new("mode", ParamType::Choice(MODES), "");
        assert_eq!(p.coerce(&json!("AUTO")).unwrap(), Some(json!("auto")));
        assert!(p.coerce(&json!("turbo")).is_err());
    }

    #[test]
    fn test_coerce_list_from_comma_string() {
        let p = ParamSpec::new("test_ids", ParamType::List, "");
        assert_eq!(
            p.coerce(&json!("TEST_001, TEST_002,")).unwrap(),
            Some(json!(["TEST_001", "TEST_002"]))
        );
    }

    #[test]
    fn test_coerce_flag_words() {
        let p = ParamSpec::new("cloud", ParamType::Flag, "");
        assert_eq!(p.coerce(&json!("yes")).unwrap(), Some(json!(true)));
        assert_eq!(p.coerce(&json!(false)).unwrap(), Some(json!(false)));
        assert!(p.coerce(&json!("maybe")).is_err());
    }

    #[test]
    fn test_create_project_takes_optional_name() {
        assert_eq!(ActionKind::parse("create-project"), Some(ActionKind::CreateProject));
        let spec = ActionKind::CreateProject.spec().unwrap();
        assert!(spec.required_params().next().is_none());
        assert_eq!(spec.param("name").map(|p| p.ty), Some(ParamType::Text));
        assert!(render_catalog().contains("- create_project:"));
    }

    #[test]
    fn test_render_catalog_mentions_required_and_defaults() {
        let text = render_catalog();
        assert!(text.contains("- run_tests:"));
        assert!(text.contains("project (text, REQUIRED"));
        assert!(text.contains("default auto"));
    }
}
