//! Chorus - 多模型生成编排器
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型（单个提供方失败 / 终止错误）
//! - **llm**: 生成客户端抽象与各提供方绑定，任务路由
//! - **observability**: 日志初始化
//! - **orchestrator**: 执行器、顺序降级、并行竞速、共识与策略选择
//! - **provider**: 提供方描述表、凭证来源、注册表与能力探测

pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod orchestrator;
pub mod provider;

pub use crate::core::{OrchestratorError, ProviderError, ProviderFailure};
pub use llm::{GenerationOptions, LlmClient, LlmError, Route, TaskCategory};
pub use orchestrator::{
    ConsensusResult, DispatchOutcome, GenerationRequest, GenerationResult, Orchestrator, Strategy,
};
pub use provider::{ProviderId, ProviderRegistry};
