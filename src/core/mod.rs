//! 核心：错误类型

pub mod error;

pub use error::{OrchestratorError, ProviderError, ProviderFailure};
