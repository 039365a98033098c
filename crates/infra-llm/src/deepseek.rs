// DeepSeek GenerationBackend (cloud chat-completions API)

use crate::http::{build_client, check_status, map_request_error, read_json};
use crate::prompt;
use async_trait::async_trait;
use eqgen_core::config::GenerationParams;
use eqgen_core::domain::{Provider, SectionDescriptor};
use eqgen_core::port::{BackendError, GenerationBackend};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Calls an OpenAI-compatible chat-completions endpoint with a bearer key
pub struct DeepSeekBackend {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl DeepSeekBackend {
    /// # Errors
    /// - BackendError::NotConfigured if `api_key` is blank
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(BackendError::NotConfigured(
                "DEEPSEEK_API_KEY not configured".to_string(),
            ));
        }
        Ok(Self {
            client: build_client(timeout)?,
            api_url: api_url.into(),
            api_key,
            model: model.into(),
            timeout,
        })
    }
}

#[async_trait]
impl GenerationBackend for DeepSeekBackend {
    async fn generate(
        &self,
        section: &SectionDescriptor,
        age: u8,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt::render(section, age),
            }],
            temperature: params.temperature,
            top_p: params.top_p,
        };

        debug!(section = %section.id, model = %self.model, "Calling DeepSeek");
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error(e, self.timeout))?;
        let response = check_status(response).await?;

        let body: ChatResponse = read_json(response, self.timeout).await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                BackendError::InvalidResponse(
                    "Invalid response format from DeepSeek Cloud API".to_string(),
                )
            })
    }

    fn provider(&self) -> Provider {
        Provider::Cloud
    }

    fn model(&self) -> &str {
        &self.model
    }
}
