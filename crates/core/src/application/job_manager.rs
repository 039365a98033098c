// Job Manager - facade used by the transport layer

use crate::application::pipeline::SectionPipeline;
use crate::application::worker::constants::SHUTDOWN_FAILURE_REASON;
use crate::application::worker::{JobRunner, WorkerPool};
use crate::config::EngineConfig;
use crate::domain::{JobRecord, Provider};
use crate::error::{AppError, Result};
use crate::port::{ArtifactStore, BackendSet, JobRegistry, TimeProvider};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Creates jobs, submits them to the worker pool and answers status queries
pub struct JobManager {
    registry: Arc<dyn JobRegistry>,
    pool: WorkerPool,
    time_provider: Arc<dyn TimeProvider>,
    providers: Vec<Provider>,
    default_provider: Provider,
}

impl JobManager {
    /// Build the pipeline and start the worker pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: &EngineConfig,
        registry: Arc<dyn JobRegistry>,
        backends: BackendSet,
        artifacts: Arc<dyn ArtifactStore>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let mut providers = backends.providers();
        providers.sort_by_key(|p| p.as_str());

        let pipeline = Arc::new(SectionPipeline::new(
            config,
            Arc::clone(&registry),
            backends,
            artifacts,
            Arc::clone(&time_provider),
        ));
        let runner: Arc<dyn JobRunner> = pipeline;
        let pool = WorkerPool::start(config.max_workers, runner);

        info!(
            max_workers = config.max_workers,
            default_provider = %config.default_provider,
            providers = ?providers,
            "Job manager started"
        );

        Self {
            registry,
            pool,
            time_provider,
            providers,
            default_provider: config.default_provider,
        }
    }

    /// Create a job and queue it for generation
    ///
    /// # Errors
    /// - AppError::InvalidArgument if the age is out of range or the provider
    ///   has no configured backend (nothing is stored)
    /// - AppError::Conflict if the pool is shut down (the record is discarded)
    pub async fn create(&self, age: i64, provider: Option<Provider>) -> Result<JobRecord> {
        let provider = provider.unwrap_or(self.default_provider);
        if !self.is_available(provider) {
            return Err(AppError::InvalidArgument(unavailable_reason(provider)));
        }

        let job = self.registry.create(age, provider).await?;
        info!(job_id = %job.id, age = job.age, provider = %provider, "Job created");

        if let Err(e) = self.pool.submit(job.id.clone()) {
            error!(job_id = %job.id, error = %e, "Failed to submit job");
            // The caller never sees the id, so the record must not outlive the error
            if let Err(remove_err) = self.registry.remove(&job.id).await {
                warn!(job_id = %job.id, error = %remove_err, "Could not discard rejected job");
            }
            return Err(e);
        }
        Ok(job)
    }

    /// Snapshot of one job
    ///
    /// # Errors
    /// - AppError::NotFound if the id is unknown
    pub async fn status(&self, id: &str) -> Result<JobRecord> {
        self.registry
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Test not found".to_string()))
    }

    /// Snapshots of all jobs ordered by creation time
    pub async fn list(&self) -> Result<Vec<JobRecord>> {
        self.registry.list().await
    }

    pub fn default_provider(&self) -> Provider {
        self.default_provider
    }

    pub fn is_available(&self, provider: Provider) -> bool {
        self.providers.contains(&provider)
    }

    /// Stop accepting jobs and wait for queued and in-flight jobs to finish
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    /// Cancel the pool and fail every job still generating
    ///
    /// Returns the number of jobs marked Failed.
    pub async fn abort(&self) -> Result<usize> {
        self.pool.cancel_all();

        let now = self.time_provider.now_millis();
        let mut failed = 0;
        for id in self.registry.generating_ids().await? {
            let result = self
                .registry
                .update(&id, Box::new(move |job| job.fail(SHUTDOWN_FAILURE_REASON, now)))
                .await;
            match result {
                Ok(_) => failed += 1,
                Err(e) => warn!(job_id = %id, error = %e, "Could not fail job during abort"),
            }
        }

        warn!(failed, "Generating jobs aborted");
        Ok(failed)
    }
}

fn unavailable_reason(provider: Provider) -> String {
    match provider {
        Provider::Cloud => {
            "Provider 'cloud' is not configured (DEEPSEEK_API_KEY missing)".to_string()
        }
        Provider::Local => "Provider 'local' is not configured".to_string(),
    }
}
