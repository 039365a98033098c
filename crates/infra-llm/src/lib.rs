// EQGen Infrastructure - LLM Adapters
// Implements: GenerationBackend (Ollama local service, DeepSeek cloud API)

mod deepseek;
mod factory;
mod http;
mod ollama;
pub mod prompt;

pub use deepseek::DeepSeekBackend;
pub use factory::{build_backends, LlmConfig};
pub use ollama::OllamaBackend;
