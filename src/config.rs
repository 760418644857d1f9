//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PILOT__*` 覆盖（双下划线表示嵌套，如 `PILOT__LLM__PROVIDER=openai`）。
//! 列表值（`PILOT__APP__PROJECTS`、`PILOT__CONFIRMATION__EDITABLE_PARAMETERS`）用逗号分隔。

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::confirm::{DEFAULT_EDITABLE, DEFAULT_MAX_INVALID_CHOICES};
use crate::memory::{CONTEXT_TURNS, DEFAULT_MAX_TURNS};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub confirmation: ConfirmationSection,
    pub logging: LoggingSection,
    pub actions: ActionsSection,
}

/// [app] 段：记忆容量与项目目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// 对话历史保留轮数
    pub max_turns: usize,
    /// 提供给模型的最近轮数
    pub context_turns: usize,
    /// 静态项目列表
    pub projects: Vec<String>,
    /// 项目根目录：每个子目录即一个项目
    pub projects_dir: Option<PathBuf>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            context_turns: CONTEXT_TURNS,
            projects: Vec::new(),
            projects_dir: None,
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：ollama / openai / deepseek / anthropic / mock
    pub provider: String,
    /// 未设置时使用各后端的默认模型
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// 读取 API Key 的环境变量名；未设置时用各后端的惯例变量
    pub api_key_env: Option<String>,
    pub temperature: f32,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: None,
            base_url: None,
            api_key_env: None,
            temperature: 0.1,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次生成请求超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [confirmation] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfirmationSection {
    /// 确认时允许修改的参数
    pub editable_parameters: Vec<String>,
    /// 连续无效输入上限，超过即放弃
    pub max_invalid_choices: usize,
}

impl Default for ConfirmationSection {
    fn default() -> Self {
        Self {
            editable_parameters: DEFAULT_EDITABLE.iter().map(|s| s.to_string()).collect(),
            max_invalid_choices: DEFAULT_MAX_INVALID_CHOICES,
        }
    }
}

/// [logging] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// 默认过滤级别；RUST_LOG 优先
    pub level: String,
    /// 以 JSON 行输出
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

/// [actions] 段：外部命令提供者
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActionsSection {
    /// 单次命令超时（秒）
    pub timeout_secs: u64,
    /// 动作标签 → shell 命令模板（`{param}` 替换为参数值）
    pub commands: HashMap<String, String>,
}

impl Default for ActionsSection {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            commands: HashMap::new(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 PILOT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（必须存在，可覆盖前面的键）
/// 3. 最后叠加环境变量 PILOT__*
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        if std::path::Path::new(&format!("{name}.toml")).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PILOT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("app.projects")
            .with_list_parse_key("confirmation.editable_parameters"),
    );

    builder.build()?.try_deserialize()
}
