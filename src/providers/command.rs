//! CommandProvider：把一个动作标签映射到配置中的 shell 命令模板
//!
//! 模板中的 `{param}` 用意图参数替换（值经过单引号转义，缺失参数替换为空串），
//! 通过 sh -c 执行并施加超时。退出码 0 视为成功。
//! stdout 最后一行若是 JSON 对象，则作为结构化结果：`message` 覆盖回复文本，
//! `run_number` 写入会话状态，整个对象作为 data 返回。

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::{Captures, Regex};
use serde_json::Value;
use tokio::process::Command;

use crate::actions::{ActionOutcome, ActionProvider};
use crate::core::AgentError;
use crate::intent::Intent;
use crate::memory::StateUpdate;

const MAX_MESSAGE_CHARS: usize = 500;

static PLACEHOLDER_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn placeholder_re() -> Option<&'static Regex> {
    PLACEHOLDER_RE
        .get_or_init(|| Regex::new(r"\{([a-z_][a-z0-9_]*)\}").ok())
        .as_ref()
}

pub struct CommandProvider {
    tag: String,
    template: String,
    timeout_secs: u64,
}

impl CommandProvider {
    pub fn new(tag: impl Into<String>, template: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            tag: tag.into(),
            template: template.into(),
            timeout_secs: timeout_secs.max(1),
        }
    }

    /// 渲染命令行
    pub fn render(&self, intent: &Intent) -> Result<String, AgentError> {
        let re = placeholder_re()
            .ok_or_else(|| AgentError::ActionFailed("placeholder pattern unavailable".to_string()))?;
        let rendered = re.replace_all(&self.template, |caps: &Captures| {
            intent
                .params
                .get(&caps[1])
                .map(|v| shell_quote(&value_to_arg(v)))
                .unwrap_or_default()
        });
        Ok(rendered.trim().to_string())
    }

    async fn run(&self, command: &str) -> Result<std::process::Output, AgentError> {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.kill_on_drop(true);
        tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
            .map_err(|_| AgentError::ActionFailed(format!("command timed out after {}s", self.timeout_secs)))?
            .map_err(|e| AgentError::ActionFailed(format!("failed to start command: {e}")))
    }
}

#[async_trait]
impl ActionProvider for CommandProvider {
    fn tag(&self) -> &str {
        &self.tag
    }

    async fn execute(&self, intent: &Intent) -> Result<ActionOutcome, AgentError> {
        let command = self.render(intent)?;
        if command.is_empty() {
            return Err(AgentError::ActionFailed(format!("empty command for '{}'", self.tag)));
        }
        tracing::info!(tag = %self.tag, command = %command, "command provider execute");

        let output = self.run(&command).await?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let (text, report) = split_report(&stdout);

        if !output.status.success() {
            let detail = if stderr.trim().is_empty() { text } else { stderr.trim().to_string() };
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Ok(ActionOutcome::failure(truncate(&format!("exit {code}: {detail}"))));
        }

        let mut state = StateUpdate::new();
        let mut message = if text.is_empty() { "Done.".to_string() } else { text };
        if let Some(report) = &report {
            if let Some(m) = report.get("message").and_then(Value::as_str) {
                message = m.to_string();
            }
            if let Some(run) = report
                .get("run_number")
                .and_then(Value::as_u64)
                .and_then(|r| u32::try_from(r).ok())
            {
                state = state.last_run_number(run);
            }
        }
        let mut outcome = ActionOutcome::success(truncate(&message)).with_state(state);
        if let Some(report) = report {
            outcome = outcome.with_data(report);
        }
        Ok(outcome)
    }
}

/// 拆出 stdout 末行的 JSON 对象
fn split_report(stdout: &str) -> (String, Option<Value>) {
    let trimmed = stdout.trim_end();
    let (head, last) = match trimmed.rfind('\n') {
        Some(pos) => (&trimmed[..pos], &trimmed[pos + 1..]),
        None => ("", trimmed),
    };
    match serde_json::from_str::<Value>(last.trim()) {
        Ok(value @ Value::Object(_)) => (head.trim().to_string(), Some(value)),
        _ => (trimmed.trim().to_string(), None),
    }
}

fn value_to_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

fn truncate(s: &str) -> String {
    if s.chars().count() > MAX_MESSAGE_CHARS {
        format!("{}...", s.chars().take(MAX_MESSAGE_CHARS).collect::<String>())
    } else {
        s.to_string()
    }
}
