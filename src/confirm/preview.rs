//! 动作预览：确认界面展示的内容

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::intent::{ActionKind, ParamMap, ParamType, RESOURCE_PARAM};
use crate::plan::{warnings_for, PlannedAction};

#[derive(Debug, Clone, Serialize)]
pub struct ActionPreview {
    pub action: ActionKind,
    pub description: String,
    pub parameters: ParamMap,
    pub warnings: Vec<String>,
    pub step_number: Option<u32>,
    pub total_steps: Option<u32>,
    /// 封闭取值集合（编辑时校验用）：枚举参数的可选值，以及项目名
    pub choices: BTreeMap<String, Vec<String>>,
}

impl ActionPreview {
    pub fn from_action(action: &PlannedAction, total_steps: usize, projects: &[String]) -> Self {
        let mut choices = BTreeMap::new();
        if let Some(spec) = action.action.spec() {
            for param in spec.params {
                if let ParamType::Choice(values) = param.ty {
                    choices.insert(
                        param.name.to_string(),
                        values.iter().map(|v| v.to_string()).collect(),
                    );
                }
            }
            if spec.param(RESOURCE_PARAM).is_some() && !projects.is_empty() {
                choices.insert(RESOURCE_PARAM.to_string(), projects.to_vec());
            }
        }
        Self {
            action: action.action,
            description: action.description.clone(),
            parameters: action.parameters.clone(),
            warnings: warnings_for(action.action, &action.parameters),
            step_number: (total_steps > 1).then_some(action.step_number),
            total_steps: (total_steps > 1).then_some(total_steps as u32),
            choices,
        }
    }

    pub fn header(&self) -> String {
        match (self.step_number, self.total_steps) {
            (Some(step), Some(total)) => format!("Step {step}/{total}: {}", self.action.display_name()),
            _ => format!("Action: {}", self.action.display_name()),
        }
    }

    /// (标签, 显示值)；跳过空值与 false
    pub fn format_parameters(&self) -> Vec<(String, String)> {
        self.parameters
            .iter()
            .filter_map(|(key, value)| {
                let display = match value {
                    Value::Null | Value::Bool(false) => return None,
                    Value::String(s) if s.is_empty() => return None,
                    Value::Bool(true) => "yes".to_string(),
                    Value::String(s) => s.clone(),
                    Value::Array(items) => items
                        .iter()
                        .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
                        .collect::<Vec<_>>()
                        .join(", "),
                    other => other.to_string(),
                };
                Some((param_label(key), display))
            })
            .collect()
    }

    /// 计划摘要中的单行
    pub fn summary_line(&self) -> String {
        self.description.clone()
    }
}

pub fn param_label(key: &str) -> String {
    let label = match key {
        "project" => "Project",
        "mode" => "Mode",
        "test_filter" => "Tests",
        "cloud" => "Cloud",
        "new_run" => "New run",
        "single_turn" => "Single turn",
        "test_limit" => "Test limit",
        "export_format" => "Format",
        "run_number" => "Run",
        "run_a" => "Run A",
        "run_b" => "Run B",
        "test_id" => "Test ID",
        "test_ids" => "Test IDs",
        other => return other.replace('_', " "),
    };
    label.to_string()
}
