// EQGen Infrastructure - Filesystem Adapter
// Implements: ArtifactStore (write-once test files grouped by age)

mod artifact_store;

pub use artifact_store::FsArtifactStore;
