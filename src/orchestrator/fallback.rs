//! 顺序降级链
//!
//! 严格按路由顺序逐个尝试，成功即停止；后面的提供方绝不会在前面成功后被调用。
//! 延迟随失败次数累加：以成功率优先于延迟。

use tokio_util::sync::CancellationToken;

use crate::core::OrchestratorError;
use crate::llm::Route;
use crate::orchestrator::{GenerationExecutor, GenerationRequest, GenerationResult};

pub async fn run_fallback(
    executor: &GenerationExecutor,
    route: &Route,
    request: &GenerationRequest,
    cancel: &CancellationToken,
) -> Result<GenerationResult, OrchestratorError> {
    let mut failures = Vec::new();

    for (i, &provider) in route.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        match executor.invoke_request(provider, request, cancel).await {
            Ok(generation) => {
                let fallback_used = i > 0 || route.degraded;
                tracing::info!(
                    provider = %provider,
                    attempt = i + 1,
                    fallback_used,
                    elapsed_ms = generation.elapsed.as_millis() as u64,
                    "fallback chain succeeded"
                );
                return Ok(GenerationResult::from_generation(
                    generation,
                    fallback_used,
                    failures,
                ));
            }
            Err(failure) => {
                tracing::warn!(
                    provider = %failure.provider,
                    error = %failure.error,
                    "provider failed, trying next"
                );
                failures.push(failure);
            }
        }
    }

    tracing::error!(task = %route.category, attempts = failures.len(), "fallback chain exhausted");
    Err(OrchestratorError::all_failed(route.category, failures))
}
