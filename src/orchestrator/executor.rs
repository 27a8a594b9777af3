//! 生成执行器
//!
//! 持有提供方注册表与单次调用超时；invoke 在超时与取消令牌约束下调用对应客户端，
//! 失败统一转为 ProviderFailure（不可用 / 调用失败 / 空响应 / 超时 / 取消）。不做重试，重试策略属于各控制器。
//! 每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::core::{ProviderError, ProviderFailure};
use crate::llm::GenerationOptions;
use crate::orchestrator::{Generation, GenerationRequest};
use crate::provider::{ProviderId, ProviderRegistry};

/// 执行器：克隆开销只有一个 Arc，可移入并发任务
#[derive(Clone)]
pub struct GenerationExecutor {
    registry: Arc<ProviderRegistry>,
    call_timeout: Duration,
}

impl GenerationExecutor {
    pub fn new(registry: Arc<ProviderRegistry>, call_timeout: Duration) -> Self {
        Self {
            registry,
            call_timeout,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// 以请求中的 prompt / 参数 / 超时调用指定提供方
    pub async fn invoke_request(
        &self,
        provider: ProviderId,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Generation, ProviderFailure> {
        let deadline = request.timeout.unwrap_or(self.call_timeout);
        self.invoke_with_timeout(provider, &request.prompt, &request.options(), deadline, cancel)
            .await
    }

    /// 使用默认超时调用
    pub async fn invoke(
        &self,
        provider: ProviderId,
        prompt: &str,
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> Result<Generation, ProviderFailure> {
        self.invoke_with_timeout(provider, prompt, options, self.call_timeout, cancel)
            .await
    }

    pub async fn invoke_with_timeout(
        &self,
        provider: ProviderId,
        prompt: &str,
        options: &GenerationOptions,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<Generation, ProviderFailure> {
        let start = Instant::now();
        let (model, result) = match self.registry.client(provider) {
            None => (None, Err(ProviderError::ProviderUnavailable)),
            Some(client) => {
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(ProviderError::Cancelled),
                    outcome = timeout(deadline, client.complete(prompt, options)) => match outcome {
                        Err(_) => Err(ProviderError::Timeout(deadline)),
                        Ok(Err(e)) => Err(ProviderError::ProviderInvocationFailed(e)),
                        Ok(Ok(text)) if text.trim().is_empty() => Err(ProviderError::EmptyResponse),
                        Ok(Ok(text)) => Ok(text),
                    },
                };
                (Some(client.model().to_string()), result)
            }
        };
        let elapsed = start.elapsed();

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.outcome(),
        };
        let audit = serde_json::json!({
            "event": "generation_audit",
            "provider": provider.as_str(),
            "model": model,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": elapsed.as_millis() as u64,
            "prompt_preview": prompt_preview(prompt),
        });
        tracing::info!(audit = %audit.to_string(), "generation");

        match result {
            Ok(text) => Ok(Generation {
                provider,
                text,
                elapsed,
            }),
            Err(error) => Err(ProviderFailure {
                provider,
                error,
                elapsed,
            }),
        }
    }
}

fn prompt_preview(prompt: &str) -> String {
    if prompt.chars().count() > 200 {
        format!("{}...", prompt.chars().take(200).collect::<String>())
    } else {
        prompt.to_string()
    }
}
