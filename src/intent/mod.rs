//! 意图层：动作目录、JSON 提取、两级解析

pub mod catalog;
pub mod extract;
#[allow(clippy::module_inception)]
pub mod intent;
pub mod parser;
pub mod prompts;

pub use catalog::{parse_flag_word, ActionKind, ActionSpec, ParamSpec, ParamType, CATALOG, RESOURCE_PARAM};
pub use extract::extract_json_block;
pub use intent::{Intent, ParamMap};
pub use parser::{
    canonical_project, decode_intent, decode_plan, normalize_params, DraftStep, IntentParser,
    ParseError, PlanOutcome,
};
