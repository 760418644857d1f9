//! 动作层：提供者注册表与计划执行器

pub mod executor;
pub mod registry;

pub use executor::{format_summary, ActionExecutor, StepResult, CANCELLED_AFTER_FAILURE, DEPENDENCY_NOT_SATISFIED};
pub use registry::{ActionOutcome, ActionProvider, ActionRegistry};
