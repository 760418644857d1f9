//! Agent Pilot - 对话式命令编排器
//!
//! 把自然语言请求转换为经过校验的多步计划，确认后按依赖顺序执行，并在多轮之间维护有界的会话记忆。
//!
//! 模块划分：
//! - **actions**: 动作提供者注册表与计划执行器
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **confirm**: 动作预览与人工确认
//! - **core**: 错误类型、状态机、构建器、编排器
//! - **intent**: 动作目录、JSON 提取、两级意图解析
//! - **llm**: 模型后端抽象与实现（Ollama / OpenAI 兼容 / DeepSeek / Anthropic / Mock）
//! - **memory**: 对话轮次与会话状态
//! - **observability**: tracing 初始化
//! - **plan**: 计划类型、描述生成、ActionPlanner
//! - **providers**: 内置与命令行动作提供者
//! - **resources**: 项目目录
//! - **ui**: 控制台抽象与交互会话

pub mod actions;
pub mod config;
pub mod confirm;
pub mod core;
pub mod intent;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod plan;
pub mod providers;
pub mod resources;
pub mod ui;

pub use crate::core::{AgentBuilder, AgentResponse, AgentState, ConversationalAgent};
