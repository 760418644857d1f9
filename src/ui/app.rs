//! 交互会话主循环
//!
//! 启动时检查模型后端是否可用（不可用则给出配置指引并退出），然后逐行读取请求：
//! 特殊命令（history / status / clear / help / exit）在本地处理，其余交给编排器。

use crate::core::{AgentError, AgentResponse, ConversationalAgent};
use crate::llm::setup_instructions;
use crate::memory::Role;
use crate::ui::Tone;

const WELCOME: &str = "\
========================================
   Test Pilot - conversational mode
========================================

I remember the context of our conversation and can run
sequences of actions. Examples:
  - \"run the tests of acme in auto mode\"
  - \"run tests then export the pdf\"
  - \"compare the last two runs\"
  - \"which tests are flaky?\"

Type 'help' for commands, 'exit' to quit.";

const HELP: &str = "\
  Requests are written in plain language, for example:
    run tests on <project> [in train|assisted|auto mode] [in the cloud]
    export the report as pdf|excel|html|csv [for run N]
    compare runs N and M / show regressions / find flaky tests
    project status / list projects / create a project / health check
    run tests then export the pdf       (several steps at once)

  Session commands:
    history      show the recent conversation
    status       show the session state
    clear        forget the conversation and session state
    exit         quit";

const HISTORY_TURNS: usize = 10;
const HISTORY_PREVIEW_CHARS: usize = 60;

/// 会话内的特殊命令
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    Exit,
    History,
    Status,
    Clear,
    Help,
}

impl SessionCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "exit" | "quit" | "q" => Some(Self::Exit),
            "history" => Some(Self::History),
            "status" => Some(Self::Status),
            "clear" | "reset" => Some(Self::Clear),
            "help" | "?" => Some(Self::Help),
            _ => None,
        }
    }
}

/// 检查模型后端；不可用时返回 ProviderUnavailable（附配置指引）
pub async fn ensure_available(agent: &ConversationalAgent, provider: &str) -> Result<(), AgentError> {
    let llm = agent.planner().llm();
    if llm.is_available().await {
        return Ok(());
    }
    let mut detail = format!("provider '{provider}' (model {}) is not reachable", llm.model());
    let instructions = setup_instructions(provider);
    if !instructions.is_empty() {
        detail.push('\n');
        detail.push_str(instructions);
    }
    Err(AgentError::ProviderUnavailable(detail))
}

/// 交互会话
pub async fn run_session(agent: &mut ConversationalAgent, provider: &str) -> Result<(), AgentError> {
    let console = agent.gate().console().clone();
    console.say(WELCOME);

    ensure_available(agent, provider).await?;
    let llm = agent.planner().llm().clone();
    console.emit(
        Tone::Success,
        &format!("Connected to {} ({})", llm.name(), llm.model()),
    );
    let projects = agent.planner().catalog().list().await;
    if projects.is_empty() {
        console.emit(Tone::Warning, "No projects configured");
    } else {
        console.emit(Tone::Muted, &format!("Projects: {}", projects.join(", ")));
    }

    loop {
        let Some(line) = console.ask("\n> ").await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match SessionCommand::parse(line) {
            Some(SessionCommand::Exit) => {
                console.say("Goodbye!");
                break;
            }
            Some(SessionCommand::History) => show_history(agent),
            Some(SessionCommand::Status) => show_status(agent),
            Some(SessionCommand::Clear) => {
                agent.reset();
                console.emit(Tone::Success, "Memory cleared");
            }
            Some(SessionCommand::Help) => console.say(HELP),
            None => {
                let response = agent.process_input(line).await;
                show_response(agent, &response);
            }
        }
    }
    Ok(())
}

/// 单次请求（命令行参数模式）
pub async fn run_once(
    agent: &mut ConversationalAgent,
    provider: &str,
    input: &str,
) -> Result<AgentResponse, AgentError> {
    ensure_available(agent, provider).await?;
    let response = agent.process_input(input).await;
    show_response(agent, &response);
    Ok(response)
}

fn show_response(agent: &ConversationalAgent, response: &AgentResponse) {
    let tone = if response.needs_input { Tone::Warning } else { Tone::Plain };
    agent.gate().console().emit(tone, &format!("\n{}", response.message));
}

fn show_history(agent: &ConversationalAgent) {
    let console = agent.gate().console();
    let turns = agent.memory().turns();
    if turns.is_empty() {
        console.emit(Tone::Muted, "  No history yet");
        return;
    }
    let rule = format!("  {}", "-".repeat(40));
    console.emit(Tone::Heading, "  Conversation history:");
    console.emit(Tone::Muted, &rule);
    for turn in turns.iter().skip(turns.len().saturating_sub(HISTORY_TURNS)) {
        let marker = match turn.role() {
            Role::User => ">",
            Role::Assistant => "<",
            Role::System => "!",
        };
        let content = turn.content().replace('\n', " ");
        let content = if content.chars().count() > HISTORY_PREVIEW_CHARS {
            format!("{}...", content.chars().take(HISTORY_PREVIEW_CHARS).collect::<String>())
        } else {
            content
        };
        console.say(&format!("  {marker} {content}"));
    }
    console.emit(Tone::Muted, &rule);
}

fn show_status(agent: &ConversationalAgent) {
    let console = agent.gate().console();
    let memory = agent.memory();
    let state = memory.state();
    let rule = format!("  {}", "-".repeat(40));
    console.emit(Tone::Heading, "  Session state:");
    console.emit(Tone::Muted, &rule);
    match &state.active_project {
        Some(project) => console.say(&format!("  Active project: {project}")),
        None => console.emit(Tone::Muted, "  No active project"),
    }
    if let Some(run) = state.last_run_number {
        console.say(&format!("  Last run: {run}"));
    }
    if let Some(action) = &state.last_action {
        let outcome = if state.last_action_success == Some(true) { "OK" } else { "FAILED" };
        console.say(&format!("  Last action: {action} ({outcome})"));
    }
    console.say(&format!("  Turns in memory: {}/{}", memory.len(), memory.max_turns()));
    console.emit(Tone::Muted, &rule);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_commands() {
        assert_eq!(SessionCommand::parse(" EXIT "), Some(SessionCommand::Exit));
        assert_eq!(SessionCommand::parse("reset"), Some(SessionCommand::Clear));
        assert_eq!(SessionCommand::parse("?"), Some(SessionCommand::Help));
        assert_eq!(SessionCommand::parse("run tests"), None);
    }
}
