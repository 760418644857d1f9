//! 核心编排层：错误类型、状态机、构建器、主控编排器

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod state;

pub use builder::{create_catalog, create_llm_from_config, create_registry, AgentBuilder};
pub use error::{AgentError, PlanError};
pub use orchestrator::{ConversationalAgent, CANCELLED, EMPTY_INPUT, SKIPPED};
pub use state::{AgentResponse, AgentState};
