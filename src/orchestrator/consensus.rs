//! 多提供方共识
//!
//! 并发调用路由中的全部提供方并等待全部结束（与竞速不同，不在首个成功时停止），
//! 收集所有成功结果并计算一致性评分。代表输出取路由顺序中第一个成功的结果，结果确定可复现。

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::core::OrchestratorError;
use crate::llm::Route;
use crate::orchestrator::agreement::agreement_score;
use crate::orchestrator::{ConsensusResult, GenerationExecutor, GenerationRequest, GenerationResult};

pub async fn run_consensus(
    executor: &GenerationExecutor,
    route: &Route,
    request: &GenerationRequest,
    cancel: &CancellationToken,
) -> Result<ConsensusResult, OrchestratorError> {
    // join_all 保持输入顺序，即路由顺序
    let settled = join_all(
        route
            .iter()
            .map(|&provider| executor.invoke_request(provider, request, cancel)),
    )
    .await;

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for outcome in settled {
        match outcome {
            Ok(generation) => results.push(GenerationResult::from_generation(generation, false, Vec::new())),
            Err(failure) => {
                tracing::warn!(
                    provider = %failure.provider,
                    error = %failure.error,
                    "consensus participant failed"
                );
                failures.push(failure);
            }
        }
    }

    let Some(primary) = results.first() else {
        tracing::error!(task = %route.category, attempts = failures.len(), "consensus: no provider succeeded");
        return Err(OrchestratorError::all_failed(route.category, failures));
    };

    let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
    let agreement = agreement_score(&texts);
    let text = primary.text.clone();
    let contributing_providers: Vec<_> = results.iter().map(|r| r.provider).collect();

    tracing::info!(
        task = %route.category,
        ?contributing_providers,
        failed = failures.len(),
        agreement,
        "consensus reached"
    );

    Ok(ConsensusResult {
        text,
        contributing_providers,
        agreement_score: agreement,
        results,
        failures,
    })
}
