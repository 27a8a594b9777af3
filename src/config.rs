//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CHORUS__*` 覆盖（双下划线表示嵌套，如 `CHORUS__ORCHESTRATOR__CALL_TIMEOUT_SECS=30`）。

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::llm::TaskCategory;
use crate::orchestrator::Strategy;
use crate::provider::ProviderId;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub orchestrator: OrchestratorSection,
    pub routing: RoutingSection,
    pub providers: ProvidersSection,
}

/// [orchestrator] 段：单次调用超时、竞速败者是否取消、类别策略覆盖
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSection {
    /// 单次提供方调用超时（秒）
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// 竞速产生赢家后是否取消仍在进行的调用
    #[serde(default = "default_cancel_race_losers")]
    pub cancel_race_losers: bool,
    #[serde(default)]
    pub strategies: HashMap<TaskCategory, Strategy>,
}

fn default_call_timeout_secs() -> u64 {
    60
}

fn default_cancel_race_losers() -> bool {
    true
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
            cancel_race_losers: default_cancel_race_losers(),
            strategies: HashMap::new(),
        }
    }
}

/// [routing] 段：覆盖默认偏好表
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RoutingSection {
    #[serde(default)]
    pub table: HashMap<TaskCategory, Vec<ProviderId>>,
}

/// [providers] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProvidersSection {
    #[serde(default)]
    pub openai: ProviderSection,
    #[serde(default)]
    pub anthropic: ProviderSection,
    #[serde(default)]
    pub gemini: ProviderSection,
    #[serde(default)]
    pub deepseek: ProviderSection,
}

impl ProvidersSection {
    pub fn get(&self, id: ProviderId) -> &ProviderSection {
        match id {
            ProviderId::OpenAi => &self.openai,
            ProviderId::Anthropic => &self.anthropic,
            ProviderId::Gemini => &self.gemini,
            ProviderId::DeepSeek => &self.deepseek,
        }
    }
}

/// [providers.<id>] 段；未设置的项取提供方描述表中的默认值
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// 覆盖读取凭证的环境变量名
    pub api_key_env: Option<String>,
    /// 直接写入的凭证，优先于环境变量
    pub api_key: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            model: None,
            base_url: None,
            api_key_env: None,
            api_key: None,
        }
    }
}

/// 从 config 目录加载配置，环境变量 CHORUS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CHORUS__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CHORUS")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
