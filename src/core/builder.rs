//! Agent 构建器：按配置组装模型后端、项目目录、动作注册表、确认门与编排器
//!
//! 交互模式与测试共用同一套组装逻辑；测试通过 with_llm / with_console 等注入替身。

use std::sync::Arc;

use crate::actions::{ActionExecutor, ActionRegistry};
use crate::config::AppConfig;
use crate::confirm::ConfirmationGate;
use crate::core::{AgentError, ConversationalAgent};
use crate::intent::ActionKind;
use crate::llm::{
    create_deepseek_client, AnthropicClient, LlmClient, MockLlmClient, OllamaClient, OpenAiClient,
};
use crate::llm::anthropic::ANTHROPIC_DEFAULT_MODEL;
use crate::llm::ollama::OLLAMA_DEFAULT_MODEL;
use crate::memory::ConversationMemory;
use crate::plan::ActionPlanner;
use crate::providers::{CommandProvider, HelpProvider, ListProjectsProvider};
use crate::resources::{CombinedCatalog, DirectoryCatalog, ResourceCatalog, StaticCatalog};
use crate::ui::{Console, TerminalConsole};

const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// 根据 [llm] 段创建模型后端
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, AgentError> {
    let llm = &cfg.llm;
    let api_key = llm
        .api_key_env
        .as_deref()
        .and_then(|var| std::env::var(var).ok());
    let timeout = llm.timeouts.request;

    let client: Arc<dyn LlmClient> = match llm.provider.to_lowercase().as_str() {
        "ollama" => {
            let model = llm.model.as_deref().unwrap_or(OLLAMA_DEFAULT_MODEL);
            Arc::new(
                OllamaClient::new(llm.base_url.as_deref(), model)
                    .with_temperature(llm.temperature)
                    .with_timeout(timeout),
            )
        }
        "openai" => {
            let model = llm.model.as_deref().unwrap_or(OPENAI_DEFAULT_MODEL);
            Arc::new(
                OpenAiClient::new(llm.base_url.as_deref(), model, api_key.as_deref())
                    .with_temperature(llm.temperature)
                    .with_timeout(timeout),
            )
        }
        "deepseek" => Arc::new(
            create_deepseek_client(llm.model.as_deref(), api_key.as_deref())
                .with_temperature(llm.temperature)
                .with_timeout(timeout),
        ),
        "anthropic" => {
            let model = llm.model.as_deref().unwrap_or(ANTHROPIC_DEFAULT_MODEL);
            let mut client = AnthropicClient::new(model, api_key.as_deref()).with_timeout(timeout);
            if let Some(url) = llm.base_url.as_deref() {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
        "mock" => Arc::new(MockLlmClient::new()),
        other => {
            return Err(AgentError::ConfigError(format!(
                "unknown llm provider '{other}' (expected ollama, openai, deepseek, anthropic or mock)"
            )))
        }
    };
    tracing::info!(provider = %client.name(), model = %client.model(), "model backend selected");
    Ok(client)
}

/// [app] projects 与 projects_dir 合并为一个目录
pub fn create_catalog(cfg: &AppConfig) -> Arc<dyn ResourceCatalog> {
    let mut sources: Vec<Box<dyn ResourceCatalog>> = Vec::new();
    if !cfg.app.projects.is_empty() {
        sources.push(Box::new(StaticCatalog::new(cfg.app.projects.clone())));
    }
    if let Some(dir) = &cfg.app.projects_dir {
        sources.push(Box::new(DirectoryCatalog::new(dir.clone())));
    }
    match sources.len() {
        0 => Arc::new(StaticCatalog::new(Vec::<String>::new())),
        1 => match sources.pop() {
            Some(only) => Arc::from(only),
            None => Arc::new(StaticCatalog::new(Vec::<String>::new())),
        },
        _ => Arc::new(CombinedCatalog::new(sources)),
    }
}

/// 内置提供者 + [actions.commands] 中的命令模板
pub fn create_registry(cfg: &AppConfig, catalog: Arc<dyn ResourceCatalog>) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(ListProjectsProvider::new(catalog));
    registry.register(HelpProvider);

    let mut tags: Vec<&String> = cfg.actions.commands.keys().collect();
    tags.sort();
    for tag in tags {
        if ActionKind::parse(tag).map(|k| k.as_str()) != Some(tag.as_str()) {
            tracing::warn!(tag = %tag, "ignoring command for unknown action tag");
            continue;
        }
        let template = &cfg.actions.commands[tag];
        registry.register(CommandProvider::new(tag.clone(), template.clone(), cfg.actions.timeout_secs));
    }
    tracing::debug!(tags = ?registry.tags(), "action providers registered");
    registry
}

pub struct AgentBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    console: Option<Arc<dyn Console>>,
    catalog: Option<Arc<dyn ResourceCatalog>>,
    registry: Option<ActionRegistry>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            console: None,
            catalog: None,
            registry: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_console(mut self, console: Arc<dyn Console>) -> Self {
        self.console = Some(console);
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn ResourceCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// 覆盖默认注册表（不再注册内置提供者与命令模板）
    pub fn with_registry(mut self, registry: ActionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn build(self) -> Result<ConversationalAgent, AgentError> {
        let llm = match self.llm {
            Some(llm) => llm,
            None => create_llm_from_config(&self.config)?,
        };
        let catalog = self.catalog.unwrap_or_else(|| create_catalog(&self.config));
        let console: Arc<dyn Console> = self
            .console
            .unwrap_or_else(|| Arc::new(TerminalConsole::new()));
        let registry = self
            .registry
            .unwrap_or_else(|| create_registry(&self.config, catalog.clone()));

        let confirmation = &self.config.confirmation;
        let gate = Arc::new(
            ConfirmationGate::new(console)
                .with_editable(confirmation.editable_parameters.iter().cloned())
                .with_max_invalid_choices(confirmation.max_invalid_choices),
        );
        let memory = ConversationMemory::new(self.config.app.max_turns)
            .with_context_turns(self.config.app.context_turns);

        Ok(ConversationalAgent::new(
            ActionPlanner::new(llm, catalog),
            gate.clone(),
            ActionExecutor::new(registry, gate),
            memory,
        ))
    }
}
