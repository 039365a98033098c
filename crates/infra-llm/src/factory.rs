// Backend factory

use crate::{DeepSeekBackend, OllamaBackend};
use eqgen_core::port::{BackendError, BackendSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Connection settings for both providers
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub deepseek_api_url: String,
    /// Cloud provider is only offered when a key is present
    pub deepseek_api_key: Option<String>,
    pub deepseek_model: String,
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "deepseek:7b".to_string(),
            deepseek_api_url: "https://api.deepseek.com/v1/chat/completions".to_string(),
            deepseek_api_key: None,
            deepseek_model: "deepseek-chat".to_string(),
            request_timeout: Duration::from_secs(300),
        }
    }
}

/// Build the backend set: Ollama always, DeepSeek only with a non-blank key
pub fn build_backends(config: &LlmConfig) -> Result<BackendSet, BackendError> {
    let ollama = OllamaBackend::new(
        &config.ollama_base_url,
        config.ollama_model.clone(),
        config.request_timeout,
    )?;
    info!(url = %config.ollama_base_url, model = %config.ollama_model, "Local backend configured");
    let mut backends = BackendSet::new().with(Arc::new(ollama));

    match config.deepseek_api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            let deepseek = DeepSeekBackend::new(
                config.deepseek_api_url.clone(),
                key,
                config.deepseek_model.clone(),
                config.request_timeout,
            )?;
            info!(model = %config.deepseek_model, "Cloud backend configured");
            backends = backends.with(Arc::new(deepseek));
        }
        _ => warn!("DEEPSEEK_API_KEY not set, cloud provider disabled"),
    }

    Ok(backends)
}
