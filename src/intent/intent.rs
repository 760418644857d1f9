//! 单条意图：动作标签 + 规范化参数

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::intent::catalog::{ActionKind, RESOURCE_PARAM};

/// 参数映射（键有序，便于日志与预览稳定输出）
pub type ParamMap = BTreeMap<String, Value>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Intent {
    pub action: ActionKind,
    pub params: ParamMap,
    pub confidence: f32,
    pub raw_text: String,
    /// 解析失败原因（action 为 Unknown 时给出）
    pub error: Option<String>,
}

impl Intent {
    pub fn new(action: ActionKind, params: ParamMap) -> Self {
        Self {
            action,
            params,
            confidence: 1.0,
            raw_text: String::new(),
            error: None,
        }
    }

    pub fn unknown(raw_text: &str, error: impl Into<String>) -> Self {
        Self {
            action: ActionKind::Unknown,
            params: ParamMap::new(),
            confidence: 0.0,
            raw_text: raw_text.to_string(),
            error: Some(error.into()),
        }
    }

    pub fn with_raw_text(mut self, raw: &str) -> Self {
        self.raw_text = raw.to_string();
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn is_unknown(&self) -> bool {
        self.action == ActionKind::Unknown
    }

    pub fn project(&self) -> Option<&str> {
        self.param_str(RESOURCE_PARAM)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    pub fn param_i64(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(Value::as_i64)
    }

    pub fn param_bool(&self, key: &str) -> bool {
        self.params.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}
