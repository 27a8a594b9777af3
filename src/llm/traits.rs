//! 生成客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Anthropic / Gemini / Mock）实现 LlmClient：
//! 把统一的 (prompt, options) 翻译成各自的请求格式，再把响应还原为纯文本。

use async_trait::async_trait;
use thiserror::Error;

/// 单次调用的统一参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    /// 输出长度上限（token）
    pub max_output_tokens: Option<u32>,
    /// 随机性（temperature）
    pub temperature: Option<f32>,
}

/// 绑定层错误：网络、HTTP 状态、响应解析
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    Build(String),
}

/// 错误文本不含请求 URL
impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_decode() {
            LlmError::Decode(e.to_string())
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

/// 生成客户端 trait：一次非流式补全
///
/// 返回空字符串不算错误，由执行器统一判定为 EmptyResponse。
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 实际调用的模型名（用于日志）
    fn model(&self) -> &str;

    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String, LlmError>;
}
