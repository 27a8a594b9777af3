//! 编排错误类型
//!
//! 单个提供方的失败以 ProviderFailure 的形式返回给控制器（不只是日志），
//! 只有在策略的全部尝试都失败后才折叠为唯一的终止错误 AllProvidersFailed。

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::llm::{LlmError, TaskCategory};
use crate::provider::ProviderId;

/// 单次提供方调用的失败原因
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// 未配置凭证或客户端无法构造
    #[error("provider unavailable")]
    ProviderUnavailable,

    #[error("invocation failed: {0}")]
    ProviderInvocationFailed(#[from] LlmError),

    /// 传输成功但没有可用文本
    #[error("empty response")]
    EmptyResponse,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,
}

impl ProviderError {
    /// 审计日志中的 outcome 字段
    pub fn outcome(&self) -> &'static str {
        match self {
            ProviderError::ProviderUnavailable => "unavailable",
            ProviderError::ProviderInvocationFailed(_) => "error",
            ProviderError::EmptyResponse => "empty",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Cancelled => "cancelled",
        }
    }
}

/// 一次失败尝试的结构化记录
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub error: ProviderError,
    pub elapsed: Duration,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({} ms)", self.provider, self.error, self.elapsed.as_millis())
    }
}

/// 调用方可见的唯一错误
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// failures 为空表示没有任何提供方被尝试（路由为空）
    #[error("all providers failed for task '{task}': {}", describe_last(.failures))]
    AllProvidersFailed {
        task: TaskCategory,
        failures: Vec<ProviderFailure>,
    },
}

impl OrchestratorError {
    pub fn all_failed(task: TaskCategory, failures: Vec<ProviderFailure>) -> Self {
        OrchestratorError::AllProvidersFailed { task, failures }
    }

    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            OrchestratorError::AllProvidersFailed { failures, .. } => failures,
        }
    }

    /// 最近一次底层失败
    pub fn last_failure(&self) -> Option<&ProviderFailure> {
        self.failures().last()
    }
}

fn describe_last(failures: &[ProviderFailure]) -> String {
    match failures.last() {
        Some(last) => last.to_string(),
        None => "no provider available".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_failed_message_carries_last_failure() {
        let err = OrchestratorError::all_failed(
            TaskCategory::Code,
            vec![
                ProviderFailure {
                    provider: ProviderId::OpenAi,
                    error: ProviderError::EmptyResponse,
                    elapsed: Duration::from_millis(5),
                },
                ProviderFailure {
                    provider: ProviderId::Gemini,
                    error: ProviderError::Timeout(Duration::from_secs(1)),
                    elapsed: Duration::from_secs(1),
                },
            ],
        );
        let msg = err.to_string();
        assert!(msg.contains("code"));
        assert!(msg.contains("gemini"));
        assert_eq!(err.last_failure().map(|f| f.provider), Some(ProviderId::Gemini));
    }

    #[test]
    fn test_all_failed_without_attempts() {
        let err = OrchestratorError::all_failed(TaskCategory::Creative, vec![]);
        assert!(err.to_string().contains("no provider available"));
        assert!(err.last_failure().is_none());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ProviderError::Cancelled.outcome(), "cancelled");
        assert_eq!(
            ProviderError::from(LlmError::Request("x".into())).outcome(),
            "error"
        );
    }
}
