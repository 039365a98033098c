// Artifact Store Port (persistence collaborator)

use crate::error::Result;
use async_trait::async_trait;

/// Write-once storage for finished tests
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist a finished test and return its reference (path)
    ///
    /// # Arguments
    /// * `artifact` - Assembled test text
    /// * `age` - Age bucket the test belongs to
    /// * `job_id` - Owning job (embedded in the file name)
    /// * `stored_at_millis` - Timestamp whose date is embedded in the file name
    ///
    /// # Errors
    /// - AppError::Persistence if the artifact cannot be written
    async fn persist(
        &self,
        artifact: &str,
        age: u8,
        job_id: &str,
        stored_at_millis: i64,
    ) -> Result<String>;

    /// Delete a stored artifact
    ///
    /// Returns false if it was already gone.
    async fn delete(&self, artifact_ref: &str) -> Result<bool>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory artifact store
    #[derive(Default)]
    pub struct MemoryArtifactStore {
        files: Mutex<HashMap<String, String>>,
        fail_writes: AtomicBool,
    }

    impl MemoryArtifactStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent `persist` fail
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        pub fn contains(&self, artifact_ref: &str) -> bool {
            self.files.lock().unwrap().contains_key(artifact_ref)
        }

        pub fn read(&self, artifact_ref: &str) -> Option<String> {
            self.files.lock().unwrap().get(artifact_ref).cloned()
        }

        pub fn len(&self) -> usize {
            self.files.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl ArtifactStore for MemoryArtifactStore {
        async fn persist(
            &self,
            artifact: &str,
            age: u8,
            job_id: &str,
            _stored_at_millis: i64,
        ) -> Result<String> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::Persistence("disk full".to_string()));
            }
            let path = format!("memory/{}/{}.txt", age, job_id);
            self.files
                .lock()
                .unwrap()
                .insert(path.clone(), artifact.to_string());
            Ok(path)
        }

        async fn delete(&self, artifact_ref: &str) -> Result<bool> {
            Ok(self.files.lock().unwrap().remove(artifact_ref).is_some())
        }
    }
}
