// Retention Sweeper
// Periodically discards terminal jobs (and their artifacts) past the retention window

use crate::application::worker::ShutdownToken;
use crate::config::RetentionConfig;
use crate::domain::JobRecord;
use crate::error::Result;
use crate::port::{ArtifactStore, JobRegistry, TimeProvider};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Outcome of one sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Jobs removed because they outlived the retention window
    pub removed_jobs: usize,
    /// Jobs evicted to respect `max_retained_jobs`
    pub evicted_jobs: usize,
    pub removed_artifacts: usize,
}

/// Retention sweeper
///
/// Generating jobs are never touched, whatever their age.
pub struct RetentionSweeper {
    registry: Arc<dyn JobRegistry>,
    artifacts: Arc<dyn ArtifactStore>,
    time_provider: Arc<dyn TimeProvider>,
    config: RetentionConfig,
}

impl RetentionSweeper {
    pub fn new(
        registry: Arc<dyn JobRegistry>,
        artifacts: Arc<dyn ArtifactStore>,
        time_provider: Arc<dyn TimeProvider>,
        config: RetentionConfig,
    ) -> Self {
        Self {
            registry,
            artifacts,
            time_provider,
            config,
        }
    }

    /// Run sweeps every `sweep_interval` until shutdown is signalled
    ///
    /// Should be spawned in tokio::spawn
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            interval_secs = self.config.sweep_interval.as_secs(),
            retention_secs = self.config.retention.as_secs(),
            max_retained_jobs = self.config.max_retained_jobs,
            "Retention sweeper started"
        );

        let mut tick = interval(self.config.sweep_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    match self.sweep_once().await {
                        Ok(report) if report != SweepReport::default() => {
                            info!(
                                removed_jobs = report.removed_jobs,
                                evicted_jobs = report.evicted_jobs,
                                removed_artifacts = report.removed_artifacts,
                                "Retention sweep completed"
                            );
                        }
                        Ok(_) => debug!("Retention sweep found nothing to remove"),
                        Err(e) => error!(error = %e, "Retention sweep failed"),
                    }
                }
                _ = shutdown.wait() => {
                    info!("Retention sweeper stopping");
                    break;
                }
            }
        }
    }

    /// Perform a single sweep
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let now = self.time_provider.now_millis();
        let cutoff = now - self.config.retention.as_millis() as i64;

        let expired = self.registry.find_terminal_before(cutoff).await?;
        let mut removed: HashSet<String> = HashSet::new();
        for job in expired {
            if self.discard(&job, &mut report).await? {
                report.removed_jobs += 1;
                removed.insert(job.id);
            }
        }

        let remaining = self.registry.count().await?;
        if remaining > self.config.max_retained_jobs {
            let mut excess = remaining - self.config.max_retained_jobs;
            let oldest_terminal: Vec<JobRecord> = self
                .registry
                .list()
                .await?
                .into_iter()
                .filter(|job| job.is_terminal() && !removed.contains(&job.id))
                .collect();

            for job in oldest_terminal {
                if excess == 0 {
                    break;
                }
                if self.discard(&job, &mut report).await? {
                    report.evicted_jobs += 1;
                    excess -= 1;
                }
            }

            if excess > 0 {
                warn!(
                    excess,
                    max_retained_jobs = self.config.max_retained_jobs,
                    "Retained job cap exceeded by jobs still generating"
                );
            }
        }

        Ok(report)
    }

    /// Remove one job and its artifact; false if the job was already gone
    async fn discard(&self, job: &JobRecord, report: &mut SweepReport) -> Result<bool> {
        let Some(removed) = self.registry.remove(&job.id).await? else {
            return Ok(false);
        };

        if let Some(path) = removed.artifact_ref.as_deref() {
            match self.artifacts.delete(path).await {
                Ok(true) => report.removed_artifacts += 1,
                Ok(false) => debug!(job_id = %removed.id, path, "Artifact already gone"),
                Err(e) => warn!(job_id = %removed.id, path, error = %e, "Failed to delete artifact"),
            }
        }

        debug!(job_id = %removed.id, status = %removed.status, "Job discarded");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Provider, SectionCursor, SectionId, SectionResult};
    use crate::port::artifact_store::mocks::MemoryArtifactStore;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::job_registry::mocks::MockJobRegistry;
    use crate::port::time_provider::mocks::ManualClock;
    use std::time::Duration;

    const HOUR_MS: i64 = 60 * 60 * 1000;
    const NOW: i64 = 100 * HOUR_MS;

    struct Fixture {
        registry: Arc<MockJobRegistry>,
        artifacts: Arc<MemoryArtifactStore>,
        sweeper: RetentionSweeper,
    }

    fn fixture(max_retained_jobs: usize) -> Fixture {
        let clock = Arc::new(ManualClock::new(NOW));
        let registry = Arc::new(MockJobRegistry::new(
            Arc::new(SequentialIdProvider::new()),
            clock.clone(),
        ));
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let sweeper = RetentionSweeper::new(
            registry.clone(),
            artifacts.clone(),
            clock,
            RetentionConfig {
                max_retained_jobs,
                ..RetentionConfig::default()
            },
        );
        Fixture {
            registry,
            artifacts,
            sweeper,
        }
    }

    async fn completed_job(f: &Fixture, id: &str, created_at: i64, completed_at: i64) -> String {
        let mut job = JobRecord::new(id, created_at, 15, Provider::Local).unwrap();
        for section in SectionId::ALL {
            job.record_section(SectionResult {
                section,
                content: "text".to_string(),
            })
            .unwrap();
        }
        let path = f.artifacts.persist("test", 15, id, completed_at).await.unwrap();
        job.complete(path.clone(), completed_at).unwrap();
        assert_eq!(job.current_section, SectionCursor::Completed);
        f.registry.insert(job);
        path
    }

    #[tokio::test]
    async fn test_sweep_respects_retention_window() {
        let f = fixture(100);
        let old_path = completed_job(&f, "old", NOW - 26 * HOUR_MS, NOW - 25 * HOUR_MS).await;
        let recent_path = completed_job(&f, "recent", NOW - 2 * HOUR_MS, NOW - HOUR_MS).await;
        f.registry
            .insert(JobRecord::new("stuck", NOW - 48 * HOUR_MS, 15, Provider::Local).unwrap());

        let report = f.sweeper.sweep_once().await.unwrap();

        assert_eq!(report.removed_jobs, 1);
        assert_eq!(report.removed_artifacts, 1);
        assert!(f.registry.get("old").await.unwrap().is_none());
        assert!(!f.artifacts.contains(&old_path));

        assert!(f.registry.get("recent").await.unwrap().is_some());
        assert!(f.artifacts.contains(&recent_path));
        assert!(f.registry.get("stuck").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_jobs_are_swept_without_artifact() {
        let f = fixture(100);
        let mut job = JobRecord::new("failed", NOW - 30 * HOUR_MS, 15, Provider::Cloud).unwrap();
        job.fail("boom", NOW - 30 * HOUR_MS).unwrap();
        f.registry.insert(job);

        let report = f.sweeper.sweep_once().await.unwrap();
        assert_eq!(report.removed_jobs, 1);
        assert_eq!(report.removed_artifacts, 0);
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let f = fixture(100);
        completed_job(&f, "old", NOW - 30 * HOUR_MS, NOW - 30 * HOUR_MS).await;

        assert_eq!(f.sweeper.sweep_once().await.unwrap().removed_jobs, 1);
        assert_eq!(f.sweeper.sweep_once().await.unwrap(), SweepReport::default());
    }

    #[tokio::test]
    async fn test_cap_evicts_oldest_terminal_jobs_only() {
        let f = fixture(2);
        f.registry
            .insert(JobRecord::new("generating", NOW - 5 * HOUR_MS, 15, Provider::Local).unwrap());
        completed_job(&f, "first", NOW - 4 * HOUR_MS, NOW - 4 * HOUR_MS).await;
        completed_job(&f, "second", NOW - 3 * HOUR_MS, NOW - 3 * HOUR_MS).await;
        completed_job(&f, "third", NOW - 2 * HOUR_MS, NOW - 2 * HOUR_MS).await;

        let report = f.sweeper.sweep_once().await.unwrap();

        assert_eq!(report.evicted_jobs, 2);
        assert!(f.registry.get("generating").await.unwrap().is_some());
        assert!(f.registry.get("first").await.unwrap().is_none());
        assert!(f.registry.get("second").await.unwrap().is_none());
        assert!(f.registry.get("third").await.unwrap().is_some());
        assert_eq!(f.registry.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let f = fixture(100);
        let sweeper = RetentionSweeper::new(
            f.registry.clone(),
            f.artifacts.clone(),
            Arc::new(ManualClock::new(NOW)),
            RetentionConfig {
                sweep_interval: Duration::from_millis(5),
                ..RetentionConfig::default()
            },
        );
        completed_job(&f, "old", NOW - 30 * HOUR_MS, NOW - 30 * HOUR_MS).await;

        let (tx, token) = crate::application::worker::shutdown_channel();
        let handle = tokio::spawn(sweeper.run(token));
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.shutdown();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper stops promptly")
            .unwrap();
        assert!(f.registry.get("old").await.unwrap().is_none());
    }
}
