// Job Registry Port (Interface)
//
// The registry is the only shared mutable structure of the engine. Implementations
// must serialize mutations per job id while letting unrelated ids proceed, and must
// never hold a lock across an await point.

use crate::domain::error::Result as DomainResult;
use crate::domain::{JobId, JobRecord, Provider};
use crate::error::Result;
use async_trait::async_trait;

/// Atomic mutation applied to one record (committed only if it returns Ok)
pub type JobMutation = Box<dyn FnOnce(&mut JobRecord) -> DomainResult<()> + Send>;

/// Registry interface for job state
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Create and store a new Generating job
    ///
    /// # Errors
    /// - AppError::InvalidArgument if age is outside [12, 18] (nothing is stored)
    async fn create(&self, age: i64, provider: Provider) -> Result<JobRecord>;

    /// Snapshot of a job by ID
    async fn get(&self, id: &str) -> Result<Option<JobRecord>>;

    /// Snapshots of all jobs ordered by creation time
    async fn list(&self) -> Result<Vec<JobRecord>>;

    /// Apply a mutation atomically and return the updated snapshot
    ///
    /// # Errors
    /// - AppError::NotFound if the job does not exist
    /// - AppError::Domain if the mutation rejected the transition (record unchanged)
    async fn update(&self, id: &str, mutation: JobMutation) -> Result<JobRecord>;

    /// Remove a job, returning it if it was present (idempotent)
    async fn remove(&self, id: &str) -> Result<Option<JobRecord>>;

    /// Terminal jobs whose completion time is before `cutoff_millis`
    async fn find_terminal_before(&self, cutoff_millis: i64) -> Result<Vec<JobRecord>>;

    /// Number of stored jobs
    async fn count(&self) -> Result<usize>;

    /// IDs of jobs still generating
    async fn generating_ids(&self) -> Result<Vec<JobId>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|job| !job.is_terminal())
            .map(|job| job.id)
            .collect())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use crate::port::{IdProvider, TimeProvider};
    use std::sync::{Arc, Mutex};

    /// Single-lock registry for unit tests (insertion order = creation order)
    pub struct MockJobRegistry {
        jobs: Mutex<Vec<JobRecord>>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        /// Every snapshot committed by `update`, in order
        history: Mutex<Vec<JobRecord>>,
    }

    impl MockJobRegistry {
        pub fn new(id_provider: Arc<dyn IdProvider>, time_provider: Arc<dyn TimeProvider>) -> Self {
            Self {
                jobs: Mutex::new(Vec::new()),
                id_provider,
                time_provider,
                history: Mutex::new(Vec::new()),
            }
        }

        /// Store a prepared record as-is
        pub fn insert(&self, job: JobRecord) {
            self.jobs.lock().unwrap().push(job);
        }

        pub fn history(&self) -> Vec<JobRecord> {
            self.history.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobRegistry for MockJobRegistry {
        async fn create(&self, age: i64, provider: Provider) -> Result<JobRecord> {
            let job = JobRecord::new(
                self.id_provider.generate_id(),
                self.time_provider.now_millis(),
                age,
                provider,
            )
            .map_err(AppError::invalid_argument)?;
            self.jobs.lock().unwrap().push(job.clone());
            Ok(job)
        }

        async fn get(&self, id: &str) -> Result<Option<JobRecord>> {
            Ok(self.jobs.lock().unwrap().iter().find(|j| j.id == id).cloned())
        }

        async fn list(&self) -> Result<Vec<JobRecord>> {
            let mut jobs = self.jobs.lock().unwrap().clone();
            jobs.sort_by_key(|j| j.created_at);
            Ok(jobs)
        }

        async fn update(&self, id: &str, mutation: JobMutation) -> Result<JobRecord> {
            let mut jobs = self.jobs.lock().unwrap();
            let slot = jobs
                .iter_mut()
                .find(|j| j.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Job {}", id)))?;
            let mut next = slot.clone();
            mutation(&mut next)?;
            *slot = next.clone();
            self.history.lock().unwrap().push(next.clone());
            Ok(next)
        }

        async fn remove(&self, id: &str) -> Result<Option<JobRecord>> {
            let mut jobs = self.jobs.lock().unwrap();
            let pos = jobs.iter().position(|j| j.id == id);
            Ok(pos.map(|p| jobs.remove(p)))
        }

        async fn find_terminal_before(&self, cutoff_millis: i64) -> Result<Vec<JobRecord>> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .iter()
                .filter(|j| j.is_terminal() && j.completed_at.is_some_and(|t| t < cutoff_millis))
                .cloned()
                .collect())
        }

        async fn count(&self) -> Result<usize> {
            Ok(self.jobs.lock().unwrap().len())
        }
    }
}
