//! ConfirmationGate：执行前的人工确认
//!
//! - 单步：confirm_action → Confirm / Modify（附修改后的完整参数）/ Skip / Abort
//! - 多步：confirm_plan → Confirm / Abort（整体接受或放弃，可先查看每步详情）
//! - 执行中：ask_continue_after_failure、进度与结果行
//!
//! 输入结束（EOF）一律视为 Abort；连续无效输入达到上限同样 Abort。

use std::sync::Arc;

use serde_json::Value;

use crate::confirm::preview::ActionPreview;
use crate::intent::{parse_flag_word, ParamMap};
use crate::ui::{Console, Tone};

/// 默认允许编辑的参数
pub const DEFAULT_EDITABLE: &[&str] = &["project", "mode", "test_filter", "cloud", "new_run", "export_format"];
pub const DEFAULT_MAX_INVALID_CHOICES: usize = 5;

const PROMPT: &str = "  > ";
const RULE_WIDTH: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Modify,
    Skip,
    Abort,
}

enum Choice {
    Confirm,
    Modify,
    Skip,
    Abort,
    Details,
    Invalid,
}

fn parse_choice(answer: &str) -> Choice {
    match answer.trim().to_lowercase().as_str() {
        "" | "c" | "confirm" | "y" | "yes" => Choice::Confirm,
        "m" | "modify" | "edit" | "e" => Choice::Modify,
        "s" | "skip" => Choice::Skip,
        "a" | "abort" | "q" | "quit" | "n" | "no" => Choice::Abort,
        "v" | "view" | "details" => Choice::Details,
        _ => Choice::Invalid,
    }
}

pub struct ConfirmationGate {
    console: Arc<dyn Console>,
    editable: Vec<String>,
    max_invalid_choices: usize,
}

impl ConfirmationGate {
    pub fn new(console: Arc<dyn Console>) -> Self {
        Self {
            console,
            editable: DEFAULT_EDITABLE.iter().map(|s| s.to_string()).collect(),
            max_invalid_choices: DEFAULT_MAX_INVALID_CHOICES,
        }
    }

    pub fn with_editable<I, S>(mut self, editable: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.editable = editable.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_invalid_choices(mut self, max: usize) -> Self {
        self.max_invalid_choices = max.max(1);
        self
    }

    pub fn console(&self) -> &Arc<dyn Console> {
        &self.console
    }

    /// 单个动作确认；Modify 时返回合并后的完整参数
    pub async fn confirm_action(&self, preview: &ActionPreview) -> (Decision, Option<ParamMap>) {
        self.show_action_box(preview);
        let mut invalid = 0usize;
        loop {
            self.console
                .emit(Tone::Muted, "  [c] Confirm  [m] Modify  [s] Skip  [a] Abort");
            let Some(answer) = self.console.ask(PROMPT).await else {
                return (Decision::Abort, None);
            };
            match parse_choice(&answer) {
                Choice::Confirm => return (Decision::Confirm, None),
                Choice::Skip => return (Decision::Skip, None),
                Choice::Abort => return (Decision::Abort, None),
                Choice::Modify => {
                    if let Some(params) = self.edit_parameters(preview).await {
                        return (Decision::Modify, Some(params));
                    }
                    self.show_action_box(preview);
                }
                Choice::Details | Choice::Invalid => {
                    invalid += 1;
                    if invalid >= self.max_invalid_choices {
                        self.console.emit(Tone::Warning, "  Too many invalid choices, aborting.");
                        return (Decision::Abort, None);
                    }
                    self.console.emit(Tone::Warning, "  Invalid choice. Use: c, m, s, a");
                }
            }
        }
    }

    /// 多步计划确认：整体接受或放弃
    pub async fn confirm_plan(&self, previews: &[ActionPreview]) -> Decision {
        self.show_plan_summary(previews);
        let mut invalid = 0usize;
        loop {
            self.console
                .emit(Tone::Muted, "  [c] Confirm all  [v] View details  [a] Abort");
            let Some(answer) = self.console.ask(PROMPT).await else {
                return Decision::Abort;
            };
            match parse_choice(&answer) {
                Choice::Confirm => return Decision::Confirm,
                Choice::Abort => return Decision::Abort,
                Choice::Details => {
                    for preview in previews {
                        self.show_action_box(preview);
                    }
                    self.show_plan_summary(previews);
                }
                Choice::Modify | Choice::Skip | Choice::Invalid => {
                    invalid += 1;
                    if invalid >= self.max_invalid_choices {
                        self.console.emit(Tone::Warning, "  Too many invalid choices, aborting.");
                        return Decision::Abort;
                    }
                    self.console.emit(Tone::Warning, "  Invalid choice. Use: c, v, a");
                }
            }
        }
    }

    pub async fn ask_continue_after_failure(&self, step: u32, error: &str) -> bool {
        self.console
            .emit(Tone::Error, &format!("  Step {step} failed: {error}"));
        self.console
            .emit(Tone::Muted, "  [c] Continue with next step  [a] Abort remaining");
        match self.console.ask(PROMPT).await {
            Some(answer) => matches!(
                answer.trim().to_lowercase().as_str(),
                "c" | "continue" | "y" | "yes"
            ),
            None => false,
        }
    }

    pub fn show_progress(&self, step: u32, total: usize, description: &str) {
        self.console
            .emit(Tone::Info, &format!("  Step {step}/{total}: {description}..."));
    }

    pub fn show_result(&self, success: bool, message: &str) {
        let tone = if success { Tone::Success } else { Tone::Error };
        self.console.emit(tone, &format!("  {message}"));
    }

    pub fn show_plan_summary(&self, previews: &[ActionPreview]) {
        let rule = format!("  {}", "-".repeat(RULE_WIDTH));
        self.console.emit(Tone::Heading, "  Execution plan:");
        self.console.emit(Tone::Muted, &rule);
        for (idx, preview) in previews.iter().enumerate() {
            self.console
                .emit(Tone::Plain, &format!("  {}. {}", idx + 1, preview.summary_line()));
            if !preview.warnings.is_empty() {
                self.console
                    .emit(Tone::Warning, &format!("     ! {}", preview.warnings.join("; ")));
            }
        }
        self.console.emit(Tone::Muted, &rule);
    }

    fn show_action_box(&self, preview: &ActionPreview) {
        let border = format!("  +{}+", "-".repeat(RULE_WIDTH));
        let divider = format!("  |{}|", "-".repeat(RULE_WIDTH));
        self.console.emit(Tone::Muted, &border);
        self.console
            .emit(Tone::Heading, &format!("  | {:<w$} |", preview.header(), w = RULE_WIDTH - 2));
        self.console
            .emit(Tone::Plain, &format!("  | {:<w$} |", preview.description, w = RULE_WIDTH - 2));
        self.console.emit(Tone::Muted, &divider);
        for (label, value) in preview.format_parameters() {
            let line = format!("{:<15}{}", format!("{label}:"), value);
            self.console
                .emit(Tone::Plain, &format!("  |   {:<w$} |", line, w = RULE_WIDTH - 4));
        }
        if !preview.warnings.is_empty() {
            self.console.emit(Tone::Muted, &divider);
            for warning in &preview.warnings {
                self.console
                    .emit(Tone::Warning, &format!("  | ! {:<w$} |", warning, w = RULE_WIDTH - 4));
            }
        }
        self.console.emit(Tone::Muted, &border);
    }

    /// 逐字段编辑；返回 None 表示取消或没有任何修改
    async fn edit_parameters(&self, preview: &ActionPreview) -> Option<ParamMap> {
        self.console
            .emit(Tone::Info, "  Edit parameters (Enter keeps the value, 'q' cancels)");
        let mut merged = preview.parameters.clone();
        let mut changed = false;

        for key in &self.editable {
            let Some(current) = preview.parameters.get(key) else {
                continue;
            };
            let choices = preview.choices.get(key);
            let (shown, hint) = match current {
                Value::Bool(b) => (if *b { "yes" } else { "no" }.to_string(), " (yes/no)".to_string()),
                Value::String(s) if s.is_empty() => ("(empty)".to_string(), String::new()),
                Value::String(s) => (s.clone(), String::new()),
                other => (other.to_string(), String::new()),
            };
            let hint = match choices {
                Some(values) if !values.is_empty() => format!(" ({})", values.join("|")),
                _ => hint,
            };

            let answer = self.console.ask(&format!("  {key} [{shown}]{hint}: ")).await?;
            let answer = answer.trim();
            if answer.eq_ignore_ascii_case("q") {
                return None;
            }
            if answer.is_empty() {
                continue;
            }
            match convert_edit(current, answer, choices.map(Vec::as_slice)) {
                Ok(value) => {
                    if &value != current {
                        merged.insert(key.clone(), value);
                        changed = true;
                    }
                }
                Err(reason) => {
                    self.console
                        .emit(Tone::Warning, &format!("  Invalid value for {key} ({reason}), keeping the original"));
                }
            }
        }
        changed.then_some(merged)
    }
}

/// 按原值类型转换用户输入
fn convert_edit(current: &Value, input: &str, choices: Option<&[String]>) -> Result<Value, String> {
    match current {
        Value::Bool(_) => parse_flag_word(input)
            .map(Value::Bool)
            .ok_or_else(|| "expected yes or no".to_string()),
        Value::Number(_) => input
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| "expected an integer".to_string()),
        _ => match choices {
            Some(values) if !values.is_empty() => values
                .iter()
                .find(|v| v.eq_ignore_ascii_case(input))
                .map(|v| Value::String(v.clone()))
                .ok_or_else(|| format!("expected one of {}", values.join(", "))),
            _ => Ok(Value::String(input.to_string())),
        },
    }
}
