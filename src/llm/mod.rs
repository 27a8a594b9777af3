//! LLM 层：生成客户端抽象与各提供方绑定（OpenAI 兼容 / DeepSeek / Anthropic / Gemini / Mock），以及任务路由

pub mod anthropic;
pub mod deepseek;
pub mod gemini;
pub mod mock;
pub mod openai;
pub mod router;
pub mod traits;

pub use anthropic::AnthropicClient;
pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT};
pub use gemini::GeminiClient;
pub use mock::{MockBehavior, MockLlmClient};
pub use openai::OpenAiClient;
pub use router::{Route, RoutingTable, TaskCategory, TaskRouter};
pub use traits::{GenerationOptions, LlmClient, LlmError};
