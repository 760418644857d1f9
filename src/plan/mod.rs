//! 计划层：计划类型、描述生成、ActionPlanner

pub mod describe;
pub mod planner;
pub mod types;

pub use describe::{describe_action, warnings_for};
pub use planner::{ActionPlanner, NOT_UNDERSTOOD, NO_RESPONSE, REPHRASE};
pub use types::{ActionStatus, ExecutionPlan, PlanCounts, PlannedAction};
