//! Shared wiring for integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use eqgen_core::application::JobManager;
use eqgen_core::config::EngineConfig;
use eqgen_core::domain::JobRecord;
use eqgen_core::port::id_provider::UuidProvider;
use eqgen_core::port::time_provider::SystemTimeProvider;
use eqgen_core::port::{BackendSet, TimeProvider};
use eqgen_infra_fs::FsArtifactStore;
use eqgen_infra_memory::InMemoryJobRegistry;
use tempfile::TempDir;

/// Real registry and artifact store over a temporary directory
pub struct Engine {
    pub manager: Arc<JobManager>,
    pub registry: Arc<InMemoryJobRegistry>,
    pub artifacts: Arc<FsArtifactStore>,
    pub time_provider: Arc<dyn TimeProvider>,
    pub dir: TempDir,
}

pub fn engine(config: &EngineConfig, backends: BackendSet) -> Engine {
    engine_with_clock(config, backends, Arc::new(SystemTimeProvider))
}

pub fn engine_with_clock(
    config: &EngineConfig,
    backends: BackendSet,
    time_provider: Arc<dyn TimeProvider>,
) -> Engine {
    let dir = tempfile::tempdir().unwrap();
    engine_in(dir, config, backends, time_provider)
}

/// Build an engine whose artifacts live in `dir`
pub fn engine_in(
    dir: TempDir,
    config: &EngineConfig,
    backends: BackendSet,
    time_provider: Arc<dyn TimeProvider>,
) -> Engine {
    let registry = Arc::new(InMemoryJobRegistry::new(
        Arc::new(UuidProvider),
        Arc::clone(&time_provider),
    ));
    let artifacts = Arc::new(FsArtifactStore::new(dir.path()));
    let manager = Arc::new(JobManager::start(
        config,
        registry.clone(),
        backends,
        artifacts.clone(),
        Arc::clone(&time_provider),
    ));
    Engine {
        manager,
        registry,
        artifacts,
        time_provider,
        dir,
    }
}

/// Poll until the job leaves Generating (panics after 10s)
pub async fn wait_terminal(manager: &JobManager, id: &str) -> JobRecord {
    for _ in 0..2000 {
        let job = manager.status(id).await.unwrap();
        assert!(job.invariants_hold(), "invariants broken: {:?}", job);
        if job.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} did not finish in time", id);
}
