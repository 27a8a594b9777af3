//! 并行竞速
//!
//! 对路由中每个提供方同时发起调用，按完成顺序取第一个成功结果。
//! 单个失败只记录，不终止竞速；只有全部尝试都结束且都失败时才返回终止错误。
//! 赢家产生后：cancel_losers 为 true 时取消令牌并中止其余任务，否则任其运行、结果丢弃。
//! 任务 panic 也记为该提供方的一次失败。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::core::{OrchestratorError, ProviderError, ProviderFailure};
use crate::llm::{LlmError, Route};
use crate::orchestrator::{GenerationExecutor, GenerationRequest, GenerationResult};

pub async fn run_race(
    executor: &GenerationExecutor,
    route: &Route,
    request: Arc<GenerationRequest>,
    cancel: &CancellationToken,
    cancel_losers: bool,
) -> Result<GenerationResult, OrchestratorError> {
    if route.is_empty() {
        return Err(OrchestratorError::all_failed(route.category, Vec::new()));
    }

    let race_token = cancel.child_token();
    let started = Instant::now();
    let mut attempts = JoinSet::new();
    let mut owners = HashMap::new();
    for &provider in route.iter() {
        let executor = executor.clone();
        let request = Arc::clone(&request);
        let token = race_token.clone();
        let handle = attempts.spawn(
            async move { executor.invoke_request(provider, &request, &token).await }
                .in_current_span(),
        );
        owners.insert(handle.id(), provider);
    }

    let mut failures = Vec::new();
    while let Some(joined) = attempts.join_next_with_id().await {
        match joined {
            Ok((_, Ok(generation))) => {
                let pending = attempts.len();
                if cancel_losers {
                    race_token.cancel();
                    attempts.abort_all();
                } else {
                    attempts.detach_all();
                }
                tracing::info!(
                    provider = %generation.provider,
                    elapsed_ms = generation.elapsed.as_millis() as u64,
                    pending,
                    cancelled = cancel_losers,
                    "race won"
                );
                return Ok(GenerationResult::from_generation(
                    generation,
                    route.degraded,
                    failures,
                ));
            }
            Ok((_, Err(failure))) => {
                tracing::warn!(
                    provider = %failure.provider,
                    error = %failure.error,
                    "race participant failed"
                );
                failures.push(failure);
            }
            Err(e) => {
                let Some(provider) = owners.get(&e.id()).copied() else {
                    tracing::error!(error = %e, "race participant task lost");
                    continue;
                };
                tracing::error!(provider = %provider, error = %e, "race participant task aborted");
                failures.push(ProviderFailure {
                    provider,
                    error: ProviderError::ProviderInvocationFailed(LlmError::Request(format!(
                        "attempt task failed: {}",
                        e
                    ))),
                    elapsed: started.elapsed(),
                });
            }
        }
    }

    tracing::error!(task = %route.category, attempts = failures.len(), "race exhausted");
    Err(OrchestratorError::all_failed(route.category, failures))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::llm::{GenerationOptions, LlmClient, MockLlmClient, RoutingTable, TaskCategory, TaskRouter};
    use crate::provider::{ProviderId, ProviderRegistry};

    fn setup(clients: Vec<(ProviderId, Arc<MockLlmClient>)>) -> (GenerationExecutor, Route) {
        let registry = ProviderRegistry::from_clients(
            clients
                .into_iter()
                .map(|(id, c)| (id, c as Arc<dyn LlmClient>)),
        );
        let route = TaskRouter::default().route_with(TaskCategory::Creative, None, |p| {
            registry.is_available(p)
        });
        (
            GenerationExecutor::new(Arc::new(registry), Duration::from_secs(10)),
            route,
        )
    }

    struct PanickingClient;

    #[async_trait::async_trait]
    impl LlmClient for PanickingClient {
        fn model(&self) -> &str {
            "panics"
        }

        async fn complete(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String, LlmError> {
            panic!("binding bug");
        }
    }

    /// 记录调用发生时所在的 span 名
    #[derive(Default)]
    struct SpanRecordingClient {
        seen: std::sync::Mutex<Option<&'static str>>,
    }

    #[async_trait::async_trait]
    impl LlmClient for SpanRecordingClient {
        fn model(&self) -> &str {
            "span"
        }

        async fn complete(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String, LlmError> {
            let name = tracing::Span::current().metadata().map(|m| m.name());
            *self.seen.lock().unwrap() = name;
            Ok("inside".into())
        }
    }

    fn request() -> Arc<GenerationRequest> {
        Arc::new(GenerationRequest::new(TaskCategory::Creative, "a poem"))
    }

    #[tokio::test]
    async fn test_fast_failure_does_not_end_race() {
        let (executor, route) = setup(vec![
            (
                ProviderId::OpenAi,
                Arc::new(MockLlmClient::failing("bad gateway").with_delay(Duration::from_millis(5))),
            ),
            (
                ProviderId::Gemini,
                Arc::new(MockLlmClient::replying("roses are red").with_delay(Duration::from_millis(60))),
            ),
        ]);

        let result = run_race(&executor, &route, request(), &CancellationToken::new(), true)
            .await
            .unwrap();
        assert_eq!(result.provider, ProviderId::Gemini);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].provider, ProviderId::OpenAi);
    }

    #[tokio::test]
    async fn test_first_completion_wins_regardless_of_route_order() {
        // Creative 默认顺序 openai 在 gemini 之前
        let (executor, route) = setup(vec![
            (
                ProviderId::OpenAi,
                Arc::new(MockLlmClient::replying("slow").with_delay(Duration::from_millis(300))),
            ),
            (
                ProviderId::Gemini,
                Arc::new(MockLlmClient::replying("fast").with_delay(Duration::from_millis(10))),
            ),
        ]);
        assert_eq!(route.providers()[0], ProviderId::OpenAi);

        let result = run_race(&executor, &route, request(), &CancellationToken::new(), true)
            .await
            .unwrap();
        assert_eq!(result.provider, ProviderId::Gemini);
    }

    #[tokio::test]
    async fn test_losers_are_cancelled() {
        let slow = Arc::new(MockLlmClient::replying("slow").with_delay(Duration::from_secs(5)));
        let (executor, route) = setup(vec![
            (ProviderId::OpenAi, slow.clone()),
            (ProviderId::Gemini, Arc::new(MockLlmClient::replying("quick"))),
        ]);

        let start = Instant::now();
        let result = run_race(&executor, &route, request(), &CancellationToken::new(), true)
            .await
            .unwrap();
        assert_eq!(result.provider, ProviderId::Gemini);
        assert!(start.elapsed() < Duration::from_secs(2));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(slow.completions(), 0);
    }

    #[tokio::test]
    async fn test_losers_run_to_completion_when_not_cancelled() {
        let slow = Arc::new(MockLlmClient::replying("slow").with_delay(Duration::from_millis(80)));
        let (executor, route) = setup(vec![
            (ProviderId::OpenAi, slow.clone()),
            (ProviderId::Gemini, Arc::new(MockLlmClient::replying("quick"))),
        ]);

        let result = run_race(&executor, &route, request(), &CancellationToken::new(), false)
            .await
            .unwrap();
        assert_eq!(result.provider, ProviderId::Gemini);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(slow.completions(), 1);
    }

    #[tokio::test]
    async fn test_failure_only_after_all_settled() {
        let slow_fail = Arc::new(MockLlmClient::failing("late").with_delay(Duration::from_millis(80)));
        let (executor, route) = setup(vec![
            (ProviderId::OpenAi, Arc::new(MockLlmClient::failing("early"))),
            (ProviderId::Gemini, slow_fail.clone()),
            (ProviderId::Anthropic, Arc::new(MockLlmClient::empty())),
        ]);

        let start = Instant::now();
        let err = run_race(&executor, &route, request(), &CancellationToken::new(), true)
            .await
            .unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(80));
        assert_eq!(err.failures().len(), 3);
        assert_eq!(slow_fail.completions(), 1);
    }

    #[tokio::test]
    async fn test_empty_route_fails_without_calls() {
        let (executor, route) = setup(vec![]);
        let err = run_race(&executor, &route, request(), &CancellationToken::new(), true)
            .await
            .unwrap_err();
        assert!(err.failures().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_attempt_is_recorded_as_failure() {
        let registry = Arc::new(ProviderRegistry::from_clients(vec![
            (ProviderId::OpenAi, Arc::new(PanickingClient) as Arc<dyn LlmClient>),
            (
                ProviderId::Gemini,
                Arc::new(MockLlmClient::failing("down")) as Arc<dyn LlmClient>,
            ),
        ]));
        let route = TaskRouter::default().route(&registry, TaskCategory::Creative, None);
        let executor = GenerationExecutor::new(registry, Duration::from_secs(10));

        let err = run_race(&executor, &route, request(), &CancellationToken::new(), true)
            .await
            .unwrap_err();
        assert_eq!(err.failures().len(), 2);
        let panicked = err
            .failures()
            .iter()
            .find(|f| f.provider == ProviderId::OpenAi)
            .unwrap();
        assert!(matches!(
            panicked.error,
            ProviderError::ProviderInvocationFailed(LlmError::Request(_))
        ));
    }

    #[tokio::test]
    async fn test_winner_reports_degraded_route_as_fallback() {
        let table = RoutingTable::default().with_overrides(&HashMap::from([(
            TaskCategory::Creative,
            vec![ProviderId::OpenAi, ProviderId::Gemini],
        )]));
        let registry = Arc::new(ProviderRegistry::from_clients(vec![(
            ProviderId::Gemini,
            Arc::new(MockLlmClient::replying("verse")) as Arc<dyn LlmClient>,
        )]));
        let route =
            TaskRouter::new(table).route(&registry, TaskCategory::Creative, Some(ProviderId::OpenAi));
        assert!(route.degraded);
        let executor = GenerationExecutor::new(registry, Duration::from_secs(10));

        let result = run_race(&executor, &route, request(), &CancellationToken::new(), true)
            .await
            .unwrap();
        assert_eq!(result.provider, ProviderId::Gemini);
        assert!(result.fallback_used);
    }

    #[tokio::test]
    async fn test_attempts_run_inside_caller_span() {
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry());
        let client = Arc::new(SpanRecordingClient::default());
        let registry = Arc::new(ProviderRegistry::from_clients(vec![(
            ProviderId::Gemini,
            client.clone() as Arc<dyn LlmClient>,
        )]));
        let route = TaskRouter::default().route(&registry, TaskCategory::Creative, None);
        let executor = GenerationExecutor::new(registry, Duration::from_secs(10));

        run_race(&executor, &route, request(), &CancellationToken::new(), true)
            .instrument(tracing::info_span!("dispatch"))
            .await
            .unwrap();
        assert_eq!(*client.seen.lock().unwrap(), Some("dispatch"));
    }
}
