//! Anthropic Messages API 客户端（原生 HTTP）
//!
//! POST {base_url}/messages，`x-api-key` + `anthropic-version` 头；响应取所有 text 块拼接。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::{GenerationOptions, LlmClient, LlmError};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Messages API 要求必须给出 max_tokens
const DEFAULT_MAX_TOKENS: u32 = 1024;

pub struct AnthropicClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    /// 构建 HTTP 客户端失败时返回错误（由注册表视为不可用）
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Result<Self, LlmError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::Build(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(ANTHROPIC_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn request_body(&self, prompt: &str, options: &GenerationOptions) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": options.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": [{"role": "user", "content": prompt}],
        });
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }
}

fn collect_text(response: MessagesResponse) -> String {
    response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("")
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String, LlmError> {
        let url = format!("{}/messages", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(prompt, options))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = resp.json().await?;
        Ok(collect_text(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_defaults_max_tokens() {
        let client = AnthropicClient::new(None, "claude-test", "key").unwrap();
        let body = client.request_body("hello", &GenerationOptions::default());
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["messages"][0]["content"], "hello");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_request_body_with_options() {
        let client = AnthropicClient::new(Some("http://localhost:9/v1/"), "claude-test", "key").unwrap();
        let options = GenerationOptions {
            max_output_tokens: Some(64),
            temperature: Some(0.5),
        };
        let body = client.request_body("hi", &options);
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(client.base_url, "http://localhost:9/v1");
    }

    #[test]
    fn test_collect_text_skips_non_text_blocks() {
        let raw = r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"Hello "},{"type":"text","text":"world"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(collect_text(parsed), "Hello world");
    }

    #[test]
    fn test_collect_text_empty_content() {
        let parsed: MessagesResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(collect_text(parsed).is_empty());
    }
}
