pub mod gemini_adapter;
pub mod ollama_adapter;
pub mod router;
pub mod types;

pub use gemini_adapter::GeminiAdapter;
pub use ollama_adapter::OllamaAdapter;
pub use router::LLMRouter;
pub use types::{CompletionRequest, LLMResponse, Message, ProviderAdapter, ProviderError, ToolCall};
