//! 提供方描述表：身份、相对成本、典型延迟与擅长领域
//!
//! 静态数据，进程启动即确定，不随生成活动变化。

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 外部生成服务身份（固定集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Gemini,
    DeepSeek,
}

impl ProviderId {
    pub const ALL: [ProviderId; 4] = [
        ProviderId::OpenAi,
        ProviderId::Anthropic,
        ProviderId::Gemini,
        ProviderId::DeepSeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Gemini => "gemini",
            ProviderId::DeepSeek => "deepseek",
        }
    }

    /// 该提供方的静态描述
    pub fn descriptor(&self) -> &'static ProviderDescriptor {
        // DESCRIPTORS 与 ALL 同序
        &DESCRIPTORS[*self as usize]
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderId::OpenAi),
            "anthropic" | "claude" => Ok(ProviderId::Anthropic),
            "gemini" | "google" => Ok(ProviderId::Gemini),
            "deepseek" => Ok(ProviderId::DeepSeek),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// 单个提供方的静态元数据
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    /// 相对成本权重（越大越贵）
    pub cost_weight: u8,
    /// 平均响应延迟估计
    pub avg_latency: Duration,
    /// 擅长领域标签
    pub strengths: &'static [&'static str],
    pub default_model: &'static str,
    pub default_base_url: &'static str,
    /// 默认读取凭证的环境变量名
    pub api_key_env: &'static str,
}

impl ProviderDescriptor {
    pub fn has_strength(&self, tag: &str) -> bool {
        self.strengths.iter().any(|s| *s == tag)
    }
}

pub static DESCRIPTORS: [ProviderDescriptor; 4] = [
    ProviderDescriptor {
        id: ProviderId::OpenAi,
        cost_weight: 3,
        avg_latency: Duration::from_millis(2500),
        strengths: &["reasoning", "structured-output", "code"],
        default_model: "gpt-4o-mini",
        default_base_url: "https://api.openai.com/v1",
        api_key_env: "OPENAI_API_KEY",
    },
    ProviderDescriptor {
        id: ProviderId::Anthropic,
        cost_weight: 4,
        avg_latency: Duration::from_millis(3000),
        strengths: &["reasoning", "analysis", "long-form"],
        default_model: "claude-3-5-sonnet-latest",
        default_base_url: "https://api.anthropic.com/v1",
        api_key_env: "ANTHROPIC_API_KEY",
    },
    ProviderDescriptor {
        id: ProviderId::Gemini,
        cost_weight: 1,
        avg_latency: Duration::from_millis(1200),
        strengths: &["speed", "summarization", "structured-output"],
        default_model: "gemini-1.5-flash",
        default_base_url: "https://generativelanguage.googleapis.com/v1beta",
        api_key_env: "GEMINI_API_KEY",
    },
    ProviderDescriptor {
        id: ProviderId::DeepSeek,
        cost_weight: 1,
        avg_latency: Duration::from_millis(2000),
        strengths: &["code", "reasoning", "low-cost"],
        default_model: "deepseek-chat",
        default_base_url: "https://api.deepseek.com",
        api_key_env: "DEEPSEEK_API_KEY",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_table_matches_ids() {
        for id in ProviderId::ALL {
            assert_eq!(id.descriptor().id, id);
        }
    }

    #[test]
    fn test_provider_id_parse() {
        assert_eq!("OpenAI".parse::<ProviderId>(), Ok(ProviderId::OpenAi));
        assert_eq!("claude".parse::<ProviderId>(), Ok(ProviderId::Anthropic));
        assert!("mistral".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_fastest_provider_is_gemini() {
        let fastest = ProviderId::ALL
            .iter()
            .min_by_key(|id| id.descriptor().avg_latency)
            .copied();
        assert_eq!(fastest, Some(ProviderId::Gemini));
        assert!(ProviderId::Gemini.descriptor().has_strength("speed"));
    }
}
