//! 控制台抽象：编排层只通过 Console 与用户交互
//!
//! - TerminalConsole：crossterm 着色输出 + tokio 逐行读取 stdin
//! - ScriptedConsole：预置回答、记录全部输出，供测试与非交互场景使用

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use crossterm::style::Stylize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// 输出语气（决定着色）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Heading,
    Info,
    Success,
    Warning,
    Error,
    Muted,
}

#[async_trait]
pub trait Console: Send + Sync {
    fn emit(&self, tone: Tone, text: &str);

    /// 读取一行输入；EOF 或中断返回 None
    async fn ask(&self, prompt: &str) -> Option<String>;

    fn say(&self, text: &str) {
        self.emit(Tone::Plain, text);
    }
}

pub struct TerminalConsole {
    stdin: tokio::sync::Mutex<Lines<BufReader<Stdin>>>,
    color: bool,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self {
            stdin: tokio::sync::Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            color: std::env::var_os("NO_COLOR").is_none(),
        }
    }

    fn styled(&self, tone: Tone, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        match tone {
            Tone::Plain => text.to_string(),
            Tone::Heading => text.bold().to_string(),
            Tone::Info => text.cyan().to_string(),
            Tone::Success => text.green().to_string(),
            Tone::Warning => text.yellow().to_string(),
            Tone::Error => text.red().to_string(),
            Tone::Muted => text.dark_grey().to_string(),
        }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Console for TerminalConsole {
    fn emit(&self, tone: Tone, text: &str) {
        println!("{}", self.styled(tone, text));
    }

    async fn ask(&self, prompt: &str) -> Option<String> {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{}", self.styled(Tone::Heading, prompt));
        let _ = stdout.flush();
        let mut lines = self.stdin.lock().await;
        match lines.next_line().await {
            Ok(Some(line)) => Some(line),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read from stdin");
                None
            }
        }
    }
}

/// 脚本化控制台
#[derive(Default)]
pub struct ScriptedConsole {
    answers: Mutex<VecDeque<String>>,
    output: Mutex<Vec<(Tone, String)>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConsole {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn push_answer(&self, answer: impl Into<String>) {
        if let Ok(mut q) = self.answers.lock() {
            q.push_back(answer.into());
        }
    }

    pub fn output(&self) -> Vec<(Tone, String)> {
        self.output.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// 全部输出拼成一段文本
    pub fn transcript(&self) -> String {
        self.output()
            .into_iter()
            .map(|(_, line)| line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn remaining_answers(&self) -> usize {
        self.answers.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    fn emit(&self, tone: Tone, text: &str) {
        if let Ok(mut out) = self.output.lock() {
            out.push((tone, text.to_string()));
        }
    }

    async fn ask(&self, prompt: &str) -> Option<String> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }
        self.answers.lock().ok().and_then(|mut q| q.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_console_replays_and_records() {
        let console = ScriptedConsole::new(["c", "yes"]);
        console.emit(Tone::Info, "hello");
        assert_eq!(console.ask("> ").await.as_deref(), Some("c"));
        assert_eq!(console.ask("> ").await.as_deref(), Some("yes"));
        assert_eq!(console.ask("> ").await, None);
        assert_eq!(console.prompts().len(), 3);
        assert_eq!(console.output(), vec![(Tone::Info, "hello".to_string())]);
    }
}
