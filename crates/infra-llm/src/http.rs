// Shared HTTP plumbing for the backends

use eqgen_core::port::BackendError;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Longest error body kept in a BackendError
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, BackendError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::NotConfigured(format!("failed to build HTTP client: {}", e)))
}

/// Map a transport error, keeping timeouts and connection failures apart
pub(crate) fn map_request_error(err: reqwest::Error, timeout: Duration) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(timeout.as_millis() as u64)
    } else if err.is_connect() {
        BackendError::Connection(err.to_string())
    } else if err.is_decode() {
        BackendError::InvalidResponse(err.to_string())
    } else {
        BackendError::Connection(err.to_string())
    }
}

/// Turn a non-success status into the matching BackendError
pub(crate) async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Auth(body),
        StatusCode::TOO_MANY_REQUESTS => BackendError::Quota(body),
        _ => BackendError::Http {
            status: status.as_u16(),
            body,
        },
    })
}

/// Decode a JSON body
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    timeout: Duration,
) -> Result<T, BackendError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| map_request_error(e, timeout))?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::InvalidResponse(e.to_string()))
}
