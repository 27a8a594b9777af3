//! Mock 生成客户端（用于测试与演示，无需 API）
//!
//! 按预设行为返回：固定文本 / 失败 / 空文本；可选延迟；记录调用与完成次数，便于断言调用顺序。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{GenerationOptions, LlmClient, LlmError};

#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// 回复固定文本
    Reply(String),
    /// 返回 Request 错误
    Fail(String),
    /// 传输成功但无文本
    Empty,
    /// 回显 prompt
    Echo,
}

#[derive(Debug)]
pub struct MockLlmClient {
    behavior: MockBehavior,
    delay: Duration,
    calls: AtomicUsize,
    completions: AtomicUsize,
}

impl MockLlmClient {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            completions: AtomicUsize::new(0),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Reply(text.into()))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(MockBehavior::Fail(message.into()))
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 被调用次数（进入 complete 即计数）
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 走完延迟并给出结果的次数；被取消的调用不计入
    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::echo()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn model(&self) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &str, _options: &GenerationOptions) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completions.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            MockBehavior::Reply(text) => Ok(text.clone()),
            MockBehavior::Fail(message) => Err(LlmError::Request(message.clone())),
            MockBehavior::Empty => Ok(String::new()),
            MockBehavior::Echo => Ok(format!("Echo from Mock: {prompt}")),
        }
    }
}
