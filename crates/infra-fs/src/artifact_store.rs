// Filesystem ArtifactStore Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eqgen_core::domain::{MAX_AGE, MIN_AGE};
use eqgen_core::error::{AppError, Result};
use eqgen_core::port::ArtifactStore;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Characters of the job id embedded in the file name
const ID_PREFIX_LEN: usize = 8;

/// Stores tests as `<root>/<age>/<DD_MM_YYYY>_<id prefix>.txt`
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Relative file location for a test (no IO)
    fn artifact_path(&self, age: u8, job_id: &str, stored_at_millis: i64) -> Result<PathBuf> {
        if job_id.is_empty()
            || !job_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AppError::Persistence(format!(
                "Invalid test id format: {:?}",
                job_id
            )));
        }
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            return Err(AppError::Persistence(format!("Invalid age parameter: {}", age)));
        }

        let date = DateTime::<Utc>::from_timestamp_millis(stored_at_millis)
            .ok_or_else(|| AppError::Persistence(format!("Invalid timestamp: {}", stored_at_millis)))?
            .format("%d_%m_%Y");
        let prefix: String = job_id.chars().take(ID_PREFIX_LEN).collect();

        Ok(self
            .root
            .join(age.to_string())
            .join(format!("{}_{}.txt", date, prefix)))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn persist(
        &self,
        artifact: &str,
        age: u8,
        job_id: &str,
        stored_at_millis: i64,
    ) -> Result<String> {
        let path = self.artifact_path(age, job_id, stored_at_millis)?;

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                AppError::Persistence(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        tokio::fs::write(&path, artifact).await.map_err(|e| {
            AppError::Persistence(format!("Failed to write {}: {}", path.display(), e))
        })?;

        info!(job_id = %job_id, path = %path.display(), bytes = artifact.len(), "Test saved");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn delete(&self, artifact_ref: &str) -> Result<bool> {
        let path = Path::new(artifact_ref);
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if escapes || !path.starts_with(&self.root) {
            return Err(AppError::Persistence(format!(
                "Refusing to delete {} outside {}",
                artifact_ref,
                self.root.display()
            )));
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %artifact_ref, "Test file deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Persistence(format!(
                "Failed to delete {}: {}",
                artifact_ref, e
            ))),
        }
    }
}
