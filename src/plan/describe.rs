//! 步骤描述与风险提示
//!
//! 描述只由动作标签与已解析的参数生成，不采用模型给出的措辞，保证同一计划每次显示一致。

use serde_json::Value;

use crate::intent::{ActionKind, ParamMap, RESOURCE_PARAM};

fn text<'a>(params: &'a ParamMap, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

fn int(params: &ParamMap, key: &str) -> Option<i64> {
    params.get(key).and_then(Value::as_i64)
}

fn flag(params: &ParamMap, key: &str) -> bool {
    params.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn run_suffix(params: &ParamMap) -> String {
    match int(params, "run_number") {
        Some(run) => format!(" (run {run})"),
        None => " (latest run)".to_string(),
    }
}

pub fn describe_action(action: ActionKind, params: &ParamMap) -> String {
    let project = text(params, RESOURCE_PARAM).unwrap_or("?");
    match action {
        ActionKind::RunTests => {
            let mut details = Vec::new();
            if let Some(mode) = text(params, "mode") {
                details.push(format!("mode {mode}"));
            }
            if let Some(filter) = text(params, "test_filter").filter(|f| *f != "pending") {
                details.push(format!("{filter} tests"));
            }
            if let Some(id) = text(params, "test_id") {
                details.push(format!("test {id}"));
            }
            if let Some(Value::Array(ids)) = params.get("test_ids") {
                let ids: Vec<&str> = ids.iter().filter_map(Value::as_str).collect();
                details.push(format!("tests {}", ids.join(", ")));
            }
            if let Some(limit) = int(params, "test_limit") {
                details.push(format!("limit {limit}"));
            }
            if flag(params, "single_turn") {
                details.push("single turn".to_string());
            }
            if flag(params, "cloud") {
                details.push("cloud".to_string());
            }
            if flag(params, "new_run") {
                details.push("new run".to_string());
            }
            if details.is_empty() {
                format!("Run tests on {project}")
            } else {
                format!("Run tests on {project} ({})", details.join(", "))
            }
        }
        ActionKind::ExportReport => {
            let format = text(params, "export_format").unwrap_or("html");
            format!("Export {format} report for {project}{}", run_suffix(params))
        }
        ActionKind::CompareRuns => match (int(params, "run_a"), int(params, "run_b")) {
            (Some(a), Some(b)) => format!("Compare runs {a} and {b} of {project}"),
            _ => format!("Compare the last two runs of {project}"),
        },
        ActionKind::ShowRegressions => format!("Show regressions in {project}{}", run_suffix(params)),
        ActionKind::DetectFlaky => format!("Detect flaky tests in {project}"),
        ActionKind::ShowStatus => match text(params, RESOURCE_PARAM) {
            Some(p) => match int(params, "run_number") {
                Some(run) => format!("Show status of {p} run {run}"),
                None => format!("Show status of {p}"),
            },
            None => "Show status of all projects".to_string(),
        },
        ActionKind::ShowPerformance => match text(params, RESOURCE_PARAM) {
            Some(p) => format!("Show performance of {p}{}", run_suffix(params)),
            None => "Show performance of all projects".to_string(),
        },
        ActionKind::HealthCheck => match text(params, RESOURCE_PARAM) {
            Some(p) => format!("Check service health for {p}"),
            None => "Check service health".to_string(),
        },
        ActionKind::CancelPipeline => format!("Cancel pipeline of {project}{}", run_suffix(params)),
        ActionKind::ListProjects => "List available projects".to_string(),
        ActionKind::CreateProject => match text(params, "name") {
            Some(name) => format!("Create project {name}"),
            None => "Create a new project".to_string(),
        },
        ActionKind::Help => "Show help".to_string(),
        ActionKind::Unknown => "Unknown action".to_string(),
    }
}

/// 需要用户留意的副作用
pub fn warnings_for(action: ActionKind, params: &ParamMap) -> Vec<String> {
    let mut warnings = Vec::new();
    if flag(params, "cloud") {
        warnings.push("executes in a remote environment (CI)".to_string());
    }
    if flag(params, "new_run") {
        warnings.push("creates a new persistent test run".to_string());
    }
    match action {
        ActionKind::CancelPipeline => warnings.push("cancels a running remote pipeline".to_string()),
        ActionKind::CreateProject => warnings.push("creates a new persistent record".to_string()),
        _ => {}
    }
    warnings
}
