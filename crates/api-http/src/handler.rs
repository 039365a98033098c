//! HTTP Handlers

use crate::error::ApiError;
use crate::types::{
    GenerateRequest, GenerateResponse, HealthResponse, ListResponse, StatusResponse, TestSummary,
    DEFAULT_AGE,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use eqgen_core::application::JobManager;
use eqgen_core::domain::{Provider, MAX_AGE, MIN_AGE};
use eqgen_core::error::AppError;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    manager: Arc<JobManager>,
}

impl AppState {
    pub fn new(manager: Arc<JobManager>) -> Self {
        Self { manager }
    }
}

fn parse_age(value: Option<&Value>) -> Result<i64, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(DEFAULT_AGE),
        Some(v) => v.as_i64().ok_or_else(|| {
            ApiError::bad_request(format!("Age must be between {} and {}", MIN_AGE, MAX_AGE))
        }),
    }
}

fn parse_provider(value: Option<&str>) -> Result<Option<Provider>, ApiError> {
    value
        .map(|raw| raw.parse::<Provider>().map_err(|e| ApiError::from(AppError::Domain(e))))
        .transpose()
}

/// POST /generate and POST /create-eq-test
pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GenerateResponse>), ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e.body_text())))?;

    let age = parse_age(request.age.as_ref())?;
    let provider = parse_provider(request.provider.as_deref())?;

    let job = state.manager.create(age, provider).await?;
    info!(job_id = %job.id, age = job.age, provider = %job.provider, "Test generation accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            success: true,
            test_id: job.id,
            status: job.status,
            provider: job.provider,
            message: "Test generation started".to_string(),
        }),
    ))
}

/// GET /status/{id}
pub async fn status(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let job = state.manager.status(&test_id).await?;
    Ok(Json(StatusResponse {
        success: true,
        test: TestSummary::from(&job),
    }))
}

/// GET /tests
pub async fn list(State(state): State<AppState>) -> Result<Json<ListResponse>, ApiError> {
    let tests = state
        .manager
        .list()
        .await?
        .iter()
        .map(TestSummary::from)
        .collect();
    Ok(Json(ListResponse {
        success: true,
        tests,
    }))
}

/// GET /health (independent of the registry)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: eqgen_core::VERSION.to_string(),
    })
}
