//! 请求与结果类型（每次请求创建，调用方消费后即丢弃）

use std::time::Duration;

use crate::core::ProviderFailure;
use crate::llm::{GenerationOptions, TaskCategory};
use crate::provider::ProviderId;

/// 生成请求
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub task: TaskCategory,
    pub prompt: String,
    /// 首选提供方；可用时排在路由首位
    pub preferred_provider: Option<ProviderId>,
    /// 强制走共识策略
    pub use_consensus: bool,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// 单次调用超时；未设置时使用编排器配置
    pub timeout: Option<Duration>,
}

impl GenerationRequest {
    pub fn new(task: TaskCategory, prompt: impl Into<String>) -> Self {
        Self {
            task,
            prompt: prompt.into(),
            preferred_provider: None,
            use_consensus: false,
            max_output_tokens: None,
            temperature: None,
            timeout: None,
        }
    }

    pub fn prefer(mut self, provider: ProviderId) -> Self {
        self.preferred_provider = Some(provider);
        self
    }

    pub fn with_consensus(mut self) -> Self {
        self.use_consensus = true;
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }
}

/// 执行器的单次成功输出（文本非空）
#[derive(Debug, Clone)]
pub struct Generation {
    pub provider: ProviderId,
    pub text: String,
    pub elapsed: Duration,
}

/// 单一提供方的生成结果
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: String,
    pub provider: ProviderId,
    /// 产出该结果的那次调用耗时
    pub elapsed: Duration,
    /// 是否经过降级路径才得到结果
    pub fallback_used: bool,
    /// 得到结果之前失败的尝试
    pub failures: Vec<ProviderFailure>,
}

impl GenerationResult {
    pub(crate) fn from_generation(
        generation: Generation,
        fallback_used: bool,
        failures: Vec<ProviderFailure>,
    ) -> Self {
        Self {
            text: generation.text,
            provider: generation.provider,
            elapsed: generation.elapsed,
            fallback_used,
            failures,
        }
    }
}

/// 共识结果
#[derive(Debug, Clone)]
pub struct ConsensusResult {
    /// 代表输出：按路由偏好顺序第一个成功的结果
    pub text: String,
    /// 成功的提供方（路由顺序）
    pub contributing_providers: Vec<ProviderId>,
    /// [0, 1] 两两 Jaccard 相似度的平均值
    pub agreement_score: f64,
    pub results: Vec<GenerationResult>,
    pub failures: Vec<ProviderFailure>,
}

impl ConsensusResult {
    pub fn primary_provider(&self) -> Option<ProviderId> {
        self.contributing_providers.first().copied()
    }
}

/// 分派结果：单一结果或共识结果
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    Single(GenerationResult),
    Consensus(ConsensusResult),
}

impl DispatchOutcome {
    pub fn text(&self) -> &str {
        match self {
            DispatchOutcome::Single(r) => &r.text,
            DispatchOutcome::Consensus(r) => &r.text,
        }
    }

    /// 产出主文本的提供方
    pub fn provider(&self) -> Option<ProviderId> {
        match self {
            DispatchOutcome::Single(r) => Some(r.provider),
            DispatchOutcome::Consensus(r) => r.primary_provider(),
        }
    }

    pub fn into_single(self) -> Option<GenerationResult> {
        match self {
            DispatchOutcome::Single(r) => Some(r),
            DispatchOutcome::Consensus(_) => None,
        }
    }

    pub fn into_consensus(self) -> Option<ConsensusResult> {
        match self {
            DispatchOutcome::Consensus(r) => Some(r),
            DispatchOutcome::Single(_) => None,
        }
    }
}
