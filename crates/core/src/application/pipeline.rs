// Section Pipeline - drives one job through its ordered sections

use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::application::worker::JobRunner;
use crate::config::{EngineConfig, GenerationParams};
use crate::domain::{
    assemble_artifact, strip_reasoning, validate_artifact, JobId, JobRecord, JobStatus, SectionId,
    SectionResult,
};
use crate::error::{AppError, Result};
use crate::port::{ArtifactStore, BackendError, BackendSet, GenerationBackend, JobRegistry, TimeProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Sequential section runner
///
/// The pipeline is the single writer of a Generating job: every step is committed
/// through `JobRegistry::update`, so readers only ever see whole steps.
pub struct SectionPipeline {
    registry: Arc<dyn JobRegistry>,
    backends: BackendSet,
    artifacts: Arc<dyn ArtifactStore>,
    time_provider: Arc<dyn TimeProvider>,
    params: GenerationParams,
    backend_timeout: Duration,
    retry: RetryPolicy,
    validate: bool,
}

impl SectionPipeline {
    pub fn new(
        config: &EngineConfig,
        registry: Arc<dyn JobRegistry>,
        backends: BackendSet,
        artifacts: Arc<dyn ArtifactStore>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            registry,
            backends,
            artifacts,
            time_provider,
            params: config.params,
            backend_timeout: config.backend_timeout,
            retry: config.retry.clone(),
            validate: config.validate_artifact,
        }
    }

    /// Run every remaining section of `job_id`, then assemble and persist the test
    ///
    /// Backend and persistence failures are absorbed into the job (status Failed);
    /// only registry errors are returned.
    pub async fn execute(&self, job_id: &str) -> Result<JobStatus> {
        let job = self
            .registry
            .get(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {}", job_id)))?;

        if job.is_terminal() {
            warn!(job_id = %job_id, status = %job.status, "Job already terminal, skipping");
            return Ok(job.status);
        }

        let Some(backend) = self.backends.get(job.provider) else {
            let reason = format!("Provider '{}' is not configured", job.provider);
            return self.fail_job(job_id, reason).await;
        };

        info!(
            job_id = %job_id,
            provider = %job.provider,
            model = backend.model(),
            age = job.age,
            "Starting test generation"
        );

        for section in SectionId::ALL.iter().skip(job.sections.len()).copied() {
            let raw = match self.generate_section(&job, backend.as_ref(), section).await {
                Ok(text) => text,
                Err(e) => {
                    let reason = format!("Failed to generate section {}: {}", section.name(), e);
                    return self.fail_job(job_id, reason).await;
                }
            };

            let content = strip_reasoning(&raw).trim().to_string();
            if content.is_empty() {
                let reason = format!("Failed to generate section: {}", section.name());
                return self.fail_job(job_id, reason).await;
            }

            let result = SectionResult { section, content };
            let updated = self
                .registry
                .update(job_id, Box::new(move |job| job.record_section(result)))
                .await?;
            info!(
                job_id = %job_id,
                section = %section,
                progress = %updated.progress_message,
                "Section completed"
            );
        }

        self.finish(job_id).await
    }

    /// One section with timeout and retries
    async fn generate_section(
        &self,
        job: &JobRecord,
        backend: &dyn GenerationBackend,
        section: SectionId,
    ) -> std::result::Result<String, BackendError> {
        let descriptor = section.descriptor();
        let mut attempt: u32 = 0;
        loop {
            let call = backend.generate(descriptor, job.age, &self.params);
            let outcome = match tokio::time::timeout(self.backend_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout(self.backend_timeout.as_millis() as u64)),
            };

            let err = match outcome {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            warn!(
                job_id = %job.id,
                section = %section,
                attempt = attempt + 1,
                error = %err,
                "Section generation attempt failed"
            );

            match self.retry.should_retry(&job.id, attempt, &err) {
                RetryDecision::Retry(delay) => {
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp => return Err(err),
            }
        }
    }

    /// Assemble, validate, persist, then mark Completed
    async fn finish(&self, job_id: &str) -> Result<JobStatus> {
        let job = self
            .registry
            .get(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {}", job_id)))?;
        let artifact = assemble_artifact(&job.sections);

        if self.validate {
            if let Err(errors) = validate_artifact(&artifact) {
                let reason = format!("Schema validation failed: {}", errors.join("; "));
                return self.fail_job(job_id, reason).await;
            }
        }

        let artifact_ref = match self
            .artifacts
            .persist(&artifact, job.age, job_id, self.time_provider.now_millis())
            .await
        {
            Ok(path) => path,
            Err(e) => return self.fail_job(job_id, format!("Failed to save test: {}", e)).await,
        };

        let now = self.time_provider.now_millis();
        let stored_ref = artifact_ref.clone();
        let completed = self
            .registry
            .update(job_id, Box::new(move |job| job.complete(stored_ref, now)))
            .await;

        match completed {
            Ok(job) => {
                info!(job_id = %job_id, file_path = %artifact_ref, "Test generated successfully");
                Ok(job.status)
            }
            Err(e) => {
                // Job vanished or turned terminal while persisting; drop the orphan file
                if let Err(delete_err) = self.artifacts.delete(&artifact_ref).await {
                    warn!(job_id = %job_id, error = %delete_err, "Failed to remove orphaned artifact");
                }
                Err(e)
            }
        }
    }

    async fn fail_job(&self, job_id: &str, reason: String) -> Result<JobStatus> {
        error!(job_id = %job_id, reason = %reason, "Test generation failed");
        let now = self.time_provider.now_millis();
        let job = self
            .registry
            .update(job_id, Box::new(move |job| job.fail(reason, now)))
            .await?;
        Ok(job.status)
    }
}

#[async_trait]
impl JobRunner for SectionPipeline {
    async fn run(&self, job_id: &JobId) -> Result<()> {
        self.execute(job_id).await.map(|_| ())
    }

    async fn fail(&self, job_id: &JobId, reason: &str) {
        if let Err(e) = self.fail_job(job_id, reason.to_string()).await {
            warn!(job_id = %job_id, error = %e, "Could not mark job as failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Provider, SectionCursor};
    use crate::port::artifact_store::mocks::MemoryArtifactStore;
    use crate::port::generation_backend::mocks::MockBackend;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::job_registry::mocks::MockJobRegistry;
    use crate::port::time_provider::mocks::ManualClock;

    struct Fixture {
        registry: Arc<MockJobRegistry>,
        artifacts: Arc<MemoryArtifactStore>,
        backend: Arc<MockBackend>,
        pipeline: SectionPipeline,
    }

    fn fixture_with(backend: MockBackend, config: EngineConfig) -> Fixture {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let registry = Arc::new(MockJobRegistry::new(
            Arc::new(SequentialIdProvider::new()),
            clock.clone(),
        ));
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let backend = Arc::new(backend);
        let pipeline = SectionPipeline::new(
            &config,
            registry.clone(),
            BackendSet::new().with(backend.clone()),
            artifacts.clone(),
            clock,
        );
        Fixture {
            registry,
            artifacts,
            backend,
            pipeline,
        }
    }

    fn fixture(backend: MockBackend) -> Fixture {
        fixture_with(backend, EngineConfig::default())
    }

    #[tokio::test]
    async fn test_happy_path_completes_all_sections() {
        let f = fixture(MockBackend::new(Provider::Local));
        let job = f.registry.create(15, Provider::Local).await.unwrap();

        let status = f.pipeline.execute(&job.id).await.unwrap();
        assert_eq!(status, JobStatus::Completed);

        let done = f.registry.get(&job.id).await.unwrap().unwrap();
        assert_eq!(done.current_section, SectionCursor::Completed);
        assert_eq!(done.sections.len(), 4);
        assert_eq!(done.progress_message, "Test generated successfully");
        assert!(done.completed_at.is_some());
        assert!(done.invariants_hold());

        let path = done.artifact_ref.unwrap();
        assert!(f.artifacts.contains(&path));

        let calls: Vec<SectionId> = f.backend.calls().into_iter().map(|(s, _)| s).collect();
        assert_eq!(calls, SectionId::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_every_committed_step_keeps_invariants() {
        let f = fixture(MockBackend::new(Provider::Local));
        let job = f.registry.create(12, Provider::Local).await.unwrap();
        f.pipeline.execute(&job.id).await.unwrap();

        let history = f.registry.history();
        assert_eq!(history.len(), 5);
        assert!(history.iter().all(JobRecord::invariants_hold));
        assert_eq!(history[1].progress_message, "Completed section 2/4: Using Emotions to Facilitate Thought");
    }

    #[tokio::test]
    async fn test_section_failure_marks_job_failed() {
        let backend = MockBackend::new(Provider::Local)
            .fail_section(SectionId::Section2, BackendError::Connection("refused".into()));
        let f = fixture(backend);
        let job = f.registry.create(15, Provider::Local).await.unwrap();

        let status = f.pipeline.execute(&job.id).await.unwrap();
        assert_eq!(status, JobStatus::Failed);

        let failed = f.registry.get(&job.id).await.unwrap().unwrap();
        assert_eq!(failed.sections.len(), 1);
        assert_eq!(failed.current_section, SectionCursor::Section2);
        assert!(failed.completed_at.is_some());
        assert!(failed.artifact_ref.is_none());
        assert!(failed
            .progress_message
            .starts_with("Failed to generate section Using Emotions to Facilitate Thought: "));
        assert!(f.artifacts.is_empty());
        assert_eq!(f.backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_retryable_failure_is_retried() {
        let backend = MockBackend::new(Provider::Local).fail_section_times(
            SectionId::Section3,
            2,
            BackendError::Http {
                status: 503,
                body: "busy".into(),
            },
        );
        let config = EngineConfig {
            retry: RetryPolicy::new(2, 1),
            ..EngineConfig::default()
        };
        let f = fixture_with(backend, config);
        let job = f.registry.create(16, Provider::Local).await.unwrap();

        assert_eq!(f.pipeline.execute(&job.id).await.unwrap(), JobStatus::Completed);
        assert_eq!(f.backend.call_count(), 6);
    }

    #[tokio::test]
    async fn test_backend_timeout_fails_job() {
        let backend = MockBackend::new(Provider::Local).with_delay(Duration::from_millis(200));
        let config = EngineConfig {
            backend_timeout: Duration::from_millis(10),
            ..EngineConfig::default()
        };
        let f = fixture_with(backend, config);
        let job = f.registry.create(15, Provider::Local).await.unwrap();

        assert_eq!(f.pipeline.execute(&job.id).await.unwrap(), JobStatus::Failed);
        let failed = f.registry.get(&job.id).await.unwrap().unwrap();
        assert_eq!(
            failed.progress_message,
            "Failed to generate section Perceiving Emotions: Request timeout after 10ms"
        );
    }

    #[tokio::test]
    async fn test_reasoning_only_output_is_rejected() {
        let backend = MockBackend::new(Provider::Local).with_output("<think>hmm</think>\n  ");
        let f = fixture(backend);
        let job = f.registry.create(15, Provider::Local).await.unwrap();

        f.pipeline.execute(&job.id).await.unwrap();
        let failed = f.registry.get(&job.id).await.unwrap().unwrap();
        assert_eq!(failed.progress_message, "Failed to generate section: Perceiving Emotions");
        assert!(failed.sections.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_layout_fails_validation() {
        let backend = MockBackend::new(Provider::Local).with_output("Just some prose.");
        let f = fixture(backend);
        let job = f.registry.create(15, Provider::Local).await.unwrap();

        assert_eq!(f.pipeline.execute(&job.id).await.unwrap(), JobStatus::Failed);
        let failed = f.registry.get(&job.id).await.unwrap().unwrap();
        assert!(failed
            .progress_message
            .starts_with("Schema validation failed: "));
        assert_eq!(failed.sections.len(), 4);
        assert!(f.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_validation_can_be_disabled() {
        let backend = MockBackend::new(Provider::Local).with_output("Just some prose.");
        let config = EngineConfig {
            validate_artifact: false,
            ..EngineConfig::default()
        };
        let f = fixture_with(backend, config);
        let job = f.registry.create(15, Provider::Local).await.unwrap();

        assert_eq!(f.pipeline.execute(&job.id).await.unwrap(), JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_persistence_failure_fails_job() {
        let f = fixture(MockBackend::new(Provider::Local));
        f.artifacts.fail_writes(true);
        let job = f.registry.create(15, Provider::Local).await.unwrap();

        assert_eq!(f.pipeline.execute(&job.id).await.unwrap(), JobStatus::Failed);
        let failed = f.registry.get(&job.id).await.unwrap().unwrap();
        assert_eq!(
            failed.progress_message,
            "Failed to save test: Persistence error: disk full"
        );
        assert!(failed.artifact_ref.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_provider_fails_job() {
        let f = fixture(MockBackend::new(Provider::Local));
        let job = f.registry.create(15, Provider::Cloud).await.unwrap();

        assert_eq!(f.pipeline.execute(&job.id).await.unwrap(), JobStatus::Failed);
        assert_eq!(f.backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_terminal_job_is_not_rerun() {
        let f = fixture(MockBackend::new(Provider::Local));
        let job = f.registry.create(15, Provider::Local).await.unwrap();
        f.pipeline.execute(&job.id).await.unwrap();

        assert_eq!(f.pipeline.execute(&job.id).await.unwrap(), JobStatus::Completed);
        assert_eq!(f.backend.call_count(), 4);
    }
}
