//! 编排层：执行器、三种分派策略（顺序降级 / 并行竞速 / 共识）与策略选择

pub mod agreement;
pub mod consensus;
pub mod executor;
pub mod fallback;
pub mod race;
pub mod selector;
pub mod types;

pub use agreement::{agreement_score, jaccard, significant_words};
pub use consensus::run_consensus;
pub use executor::GenerationExecutor;
pub use fallback::run_fallback;
pub use race::run_race;
pub use selector::{default_strategy, Orchestrator, Strategy};
pub use types::{
    ConsensusResult, DispatchOutcome, Generation, GenerationRequest, GenerationResult,
};
