// In-memory JobRegistry Implementation

use async_trait::async_trait;
use eqgen_core::domain::{JobId, JobRecord, Provider};
use eqgen_core::error::{AppError, Result};
use eqgen_core::port::{IdProvider, JobMutation, JobRegistry, TimeProvider};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::debug;

/// One stored job: insertion sequence plus its own lock
struct Entry {
    seq: u64,
    record: Arc<Mutex<JobRecord>>,
}

fn lock(record: &Mutex<JobRecord>) -> MutexGuard<'_, JobRecord> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-local registry
///
/// The map lock is held only for lookup/insert/remove; mutations lock the single
/// entry they touch, so unrelated jobs never contend. No lock is held across an await.
pub struct InMemoryJobRegistry {
    jobs: RwLock<HashMap<JobId, Entry>>,
    next_seq: AtomicU64,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl InMemoryJobRegistry {
    pub fn new(id_provider: Arc<dyn IdProvider>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            id_provider,
            time_provider,
        }
    }

    fn entry(&self, id: &str) -> Option<Arc<Mutex<JobRecord>>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|entry| Arc::clone(&entry.record))
    }

    /// Snapshots ordered by creation time, ties broken by insertion order
    fn snapshot(&self) -> Vec<JobRecord> {
        let entries: Vec<(u64, Arc<Mutex<JobRecord>>)> = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|entry| (entry.seq, Arc::clone(&entry.record)))
            .collect();

        let mut jobs: Vec<(i64, u64, JobRecord)> = entries
            .into_iter()
            .map(|(seq, record)| {
                let job = lock(&record).clone();
                (job.created_at, seq, job)
            })
            .collect();
        jobs.sort_by_key(|(created_at, seq, _)| (*created_at, *seq));
        jobs.into_iter().map(|(_, _, job)| job).collect()
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn create(&self, age: i64, provider: Provider) -> Result<JobRecord> {
        let job = JobRecord::new(
            self.id_provider.generate_id(),
            self.time_provider.now_millis(),
            age,
            provider,
        )
        .map_err(AppError::invalid_argument)?;

        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if jobs.contains_key(&job.id) {
            return Err(AppError::Conflict(format!("Job {} already exists", job.id)));
        }
        jobs.insert(
            job.id.clone(),
            Entry {
                seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
                record: Arc::new(Mutex::new(job.clone())),
            },
        );
        drop(jobs);

        debug!(job_id = %job.id, "Job registered");
        Ok(job)
    }

    async fn get(&self, id: &str) -> Result<Option<JobRecord>> {
        Ok(self.entry(id).map(|record| lock(&record).clone()))
    }

    async fn list(&self) -> Result<Vec<JobRecord>> {
        Ok(self.snapshot())
    }

    async fn update(&self, id: &str, mutation: JobMutation) -> Result<JobRecord> {
        let record = self
            .entry(id)
            .ok_or_else(|| AppError::NotFound(format!("Job {}", id)))?;

        let mut current = lock(&record);
        let mut next = current.clone();
        mutation(&mut next)?;
        *current = next.clone();
        Ok(next)
    }

    async fn remove(&self, id: &str) -> Result<Option<JobRecord>> {
        let removed = self
            .jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        Ok(removed.map(|entry| lock(&entry.record).clone()))
    }

    async fn find_terminal_before(&self, cutoff_millis: i64) -> Result<Vec<JobRecord>> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|job| job.is_terminal() && job.completed_at.is_some_and(|t| t < cutoff_millis))
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.jobs.read().unwrap_or_else(PoisonError::into_inner).len())
    }
}
