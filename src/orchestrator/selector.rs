//! 策略选择与分派
//!
//! - 高关键性任务（分析 / 结构化元数据，或请求显式要求共识）：共识
//! - 延迟敏感 / 创意任务：竞速；竞速本身失败时退回顺序降级链兜底
//! - 其余：顺序降级链

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::core::OrchestratorError;
use crate::llm::{Route, RoutingTable, TaskCategory, TaskRouter};
use crate::orchestrator::{
    run_consensus, run_fallback, run_race, ConsensusResult, DispatchOutcome, GenerationExecutor,
    GenerationRequest, GenerationResult,
};
use crate::provider::{ProviderId, ProviderRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Fallback,
    Race,
    Consensus,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Fallback => "fallback",
            Strategy::Race => "race",
            Strategy::Consensus => "consensus",
        })
    }
}

/// 类别的默认策略
pub fn default_strategy(category: TaskCategory) -> Strategy {
    match category {
        TaskCategory::Analysis | TaskCategory::Metadata => Strategy::Consensus,
        TaskCategory::Creative => Strategy::Race,
        TaskCategory::Reasoning | TaskCategory::Content | TaskCategory::Code => Strategy::Fallback,
    }
}

/// 编排器：注册表 + 路由器 + 执行器 + 策略表
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    router: TaskRouter,
    executor: GenerationExecutor,
    strategies: HashMap<TaskCategory, Strategy>,
    cancel_race_losers: bool,
}

impl Orchestrator {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self::from_config(&AppConfig::default(), registry)
    }

    pub fn from_config(config: &AppConfig, registry: Arc<ProviderRegistry>) -> Self {
        let table = RoutingTable::default().with_overrides(&config.routing.table);
        let executor = GenerationExecutor::new(
            Arc::clone(&registry),
            Duration::from_secs(config.orchestrator.call_timeout_secs),
        );
        Self {
            registry,
            router: TaskRouter::new(table),
            executor,
            strategies: config.orchestrator.strategies.clone(),
            cancel_race_losers: config.orchestrator.cancel_race_losers,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.executor = GenerationExecutor::new(Arc::clone(&self.registry), call_timeout);
        self
    }

    pub fn with_cancel_race_losers(mut self, cancel: bool) -> Self {
        self.cancel_race_losers = cancel;
        self
    }

    pub fn with_strategy(mut self, category: TaskCategory, strategy: Strategy) -> Self {
        self.strategies.insert(category, strategy);
        self
    }

    pub fn with_routing_table(mut self, table: RoutingTable) -> Self {
        self.router = TaskRouter::new(table);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn router(&self) -> &TaskRouter {
        &self.router
    }

    pub fn probe(&self) -> BTreeMap<ProviderId, bool> {
        self.registry.probe()
    }

    pub fn route(&self, category: TaskCategory, preferred: Option<ProviderId>) -> Route {
        self.router.route(&self.registry, category, preferred)
    }

    pub fn select_strategy(&self, request: &GenerationRequest) -> Strategy {
        if request.use_consensus {
            return Strategy::Consensus;
        }
        self.strategies
            .get(&request.task)
            .copied()
            .unwrap_or_else(|| default_strategy(request.task))
    }

    pub async fn dispatch(
        &self,
        request: GenerationRequest,
    ) -> Result<DispatchOutcome, OrchestratorError> {
        self.dispatch_with_cancel(request, CancellationToken::new())
            .await
    }

    /// 取消 cancel 后，所有进行中的尝试以 Cancelled 结束
    pub async fn dispatch_with_cancel(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<DispatchOutcome, OrchestratorError> {
        let strategy = self.select_strategy(&request);
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "dispatch",
            %request_id,
            task = %request.task,
            %strategy
        );

        async move {
            let route = self.route(request.task, request.preferred_provider);
            if route.is_empty() {
                tracing::error!("no provider available for task");
                return Err(OrchestratorError::all_failed(request.task, Vec::new()));
            }

            match strategy {
                Strategy::Consensus => run_consensus(&self.executor, &route, &request, &cancel)
                    .await
                    .map(DispatchOutcome::Consensus),
                Strategy::Race => self
                    .race_with_safety_net(&route, request, &cancel)
                    .await
                    .map(DispatchOutcome::Single),
                Strategy::Fallback => run_fallback(&self.executor, &route, &request, &cancel)
                    .await
                    .map(DispatchOutcome::Single),
            }
        }
        .instrument(span)
        .await
    }

    /// 直接走顺序降级链
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult, OrchestratorError> {
        let route = self.route(request.task, request.preferred_provider);
        run_fallback(&self.executor, &route, &request, &CancellationToken::new()).await
    }

    /// 直接竞速（不带兜底）
    pub async fn race(&self, request: GenerationRequest) -> Result<GenerationResult, OrchestratorError> {
        let route = self.route(request.task, request.preferred_provider);
        run_race(
            &self.executor,
            &route,
            Arc::new(request),
            &CancellationToken::new(),
            self.cancel_race_losers,
        )
        .await
    }

    pub async fn consensus(&self, request: GenerationRequest) -> Result<ConsensusResult, OrchestratorError> {
        let route = self.route(request.task, request.preferred_provider);
        run_consensus(&self.executor, &route, &request, &CancellationToken::new()).await
    }

    async fn race_with_safety_net(
        &self,
        route: &Route,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, OrchestratorError> {
        let request = Arc::new(request);
        let race_err = match run_race(
            &self.executor,
            route,
            Arc::clone(&request),
            cancel,
            self.cancel_race_losers,
        )
        .await
        {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };
        tracing::warn!(error = %race_err, "race failed, falling back to sequential chain");

        let mut failures = match race_err {
            OrchestratorError::AllProvidersFailed { failures, .. } => failures,
        };
        match run_fallback(&self.executor, route, &request, cancel).await {
            Ok(mut result) => {
                result.fallback_used = true;
                failures.append(&mut result.failures);
                result.failures = failures;
                Ok(result)
            }
            Err(OrchestratorError::AllProvidersFailed {
                task,
                failures: mut chain_failures,
            }) => {
                failures.append(&mut chain_failures);
                Err(OrchestratorError::all_failed(task, failures))
            }
        }
    }
}
