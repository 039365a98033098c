//! HTTP Request/Response Types

use eqgen_core::domain::{JobRecord, Provider, JobStatus};
use eqgen_core::port::time_provider::to_rfc3339;
use serde::{Deserialize, Serialize};

/// Age used when a request omits it
pub const DEFAULT_AGE: i64 = 15;

/// POST /generate, POST /create-eq-test
///
/// Fields are kept loose so type mismatches surface as validation messages.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub age: Option<serde_json::Value>,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub test_id: String,
    pub status: JobStatus,
    pub provider: Provider,
    pub message: String,
}

/// GET /status/{id}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub test: TestSummary,
}

/// Public projection of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub test_id: String,
    pub age: u8,
    pub status: JobStatus,
    pub progress: String,
    pub current_section: String,
    pub provider: Provider,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub file_path: Option<String>,
}

impl From<&JobRecord> for TestSummary {
    fn from(job: &JobRecord) -> Self {
        Self {
            test_id: job.id.clone(),
            age: job.age,
            status: job.status,
            progress: job.progress_message.clone(),
            current_section: job.current_section.to_string(),
            provider: job.provider,
            created_at: to_rfc3339(job.created_at),
            completed_at: job.completed_at.map(to_rfc3339),
            file_path: job.artifact_ref.clone(),
        }
    }
}

/// GET /tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub success: bool,
    pub tests: Vec<TestSummary>,
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
