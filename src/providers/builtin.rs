//! 内置提供者：list_projects 与 help

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::actions::{ActionOutcome, ActionProvider};
use crate::core::AgentError;
use crate::intent::{ActionKind, Intent, CATALOG};
use crate::resources::ResourceCatalog;

pub struct ListProjectsProvider {
    catalog: Arc<dyn ResourceCatalog>,
}

impl ListProjectsProvider {
    pub fn new(catalog: Arc<dyn ResourceCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ActionProvider for ListProjectsProvider {
    fn tag(&self) -> &str {
        ActionKind::ListProjects.as_str()
    }

    async fn execute(&self, _intent: &Intent) -> Result<ActionOutcome, AgentError> {
        let projects = self.catalog.list().await;
        if projects.is_empty() {
            return Ok(ActionOutcome::success("No projects configured.").with_data(json!([])));
        }
        Ok(ActionOutcome::success(format!("Available projects: {}", projects.join(", ")))
            .with_data(json!(projects)))
    }
}

pub struct HelpProvider;

#[async_trait]
impl ActionProvider for HelpProvider {
    fn tag(&self) -> &str {
        ActionKind::Help.as_str()
    }

    async fn execute(&self, _intent: &Intent) -> Result<ActionOutcome, AgentError> {
        let mut lines = vec!["I can:".to_string()];
        lines.extend(
            CATALOG
                .iter()
                .filter(|spec| spec.kind != ActionKind::Help)
                .map(|spec| format!("  - {} ({})", spec.summary, spec.kind.as_str())),
        );
        lines.push("Try: \"run tests on <project> then export the report as pdf\".".to_string());
        Ok(ActionOutcome::success(lines.join("\n")))
    }
}
