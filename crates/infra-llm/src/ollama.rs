// Ollama GenerationBackend (local model service)

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
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Calls `POST {base_url}/api/generate` with streaming disabled
pub struct OllamaBackend {
    client: Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl OllamaBackend {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.into(),
            timeout,
        })
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    async fn generate(
        &self,
        section: &SectionDescriptor,
        age: u8,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: prompt::render(section, age),
            stream: false,
            options: GenerateOptions {
                temperature: params.temperature,
                top_p: params.top_p,
            },
        };

        debug!(section = %section.id, model = %self.model, "Calling Ollama");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error(e, self.timeout))?;
        let response = check_status(response).await?;

        let body: GenerateResponse = read_json(response, self.timeout).await?;
        body.response.ok_or_else(|| {
            BackendError::InvalidResponse("Invalid response format from Ollama API".to_string())
        })
    }

    fn provider(&self) -> Provider {
        Provider::Local
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eqgen_core::domain::SectionId;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer, timeout: Duration) -> OllamaBackend {
        OllamaBackend::new(&server.uri(), "deepseek:7b", timeout).unwrap()
    }

    #[tokio::test]
    async fn test_generate_returns_response_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "deepseek:7b",
                "stream": false,
                "options": { "temperature": 0.5, "top_p": 0.75 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "deepseek:7b",
                "response": "Branch 1: Perceiving Emotions\n...",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let params = GenerationParams {
            temperature: 0.5,
            top_p: 0.75,
        };
        let text = backend(&server, Duration::from_secs(5))
            .generate(SectionId::Section1.descriptor(), 15, &params)
            .await
            .unwrap();
        assert_eq!(text, "Branch 1: Perceiving Emotions\n...");
    }

    #[tokio::test]
    async fn test_missing_response_field_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"done": true})))
            .mount(&server)
            .await;

        let err = backend(&server, Duration::from_secs(5))
            .generate(SectionId::Section2.descriptor(), 15, &GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_retryable_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let err = backend(&server, Duration::from_secs(5))
            .generate(SectionId::Section1.descriptor(), 12, &GenerationParams::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BackendError::Http {
                status: 500,
                body: "model not loaded".to_string()
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "late"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = backend(&server, Duration::from_millis(50))
            .generate(SectionId::Section1.descriptor(), 15, &GenerationParams::default())
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::Timeout(50));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_connection_error() {
        // Nothing listens on port 9 (discard) in the test environment
        let backend = OllamaBackend::new("http://127.0.0.1:9", "m", Duration::from_secs(2)).unwrap();
        let err = backend
            .generate(SectionId::Section1.descriptor(), 15, &GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Connection(_)));
    }
}
