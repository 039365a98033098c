//! HTTP Error Mapping
//!
//! Maps application errors to status codes with a `{success:false, error}` body.

use crate::types::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use eqgen_core::domain::DomainError;
use eqgen_core::error::AppError;
use tracing::error;

/// Error returned by handlers
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

/// Convert AppError to an HTTP status and message
pub fn to_http_error(err: AppError) -> ApiError {
    let (status, message) = match err {
        AppError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg),
        AppError::Domain(DomainError::ValidationError(msg)) => (StatusCode::BAD_REQUEST, msg),
        AppError::Domain(e @ DomainError::InvalidAge { .. }) => (StatusCode::BAD_REQUEST, e.to_string()),
        AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        other => {
            error!(error = %other, "Request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    };
    ApiError { status, message }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        to_http_error(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            success: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
