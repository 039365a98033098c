// Port Layer - Interfaces for external dependencies

pub mod artifact_store;
pub mod generation_backend;
pub mod id_provider; // For deterministic testing
pub mod job_registry;
pub mod time_provider;

// Re-exports
pub use artifact_store::ArtifactStore;
pub use generation_backend::{BackendError, BackendSet, GenerationBackend};
pub use id_provider::IdProvider;
pub use job_registry::{JobMutation, JobRegistry};
pub use time_provider::TimeProvider;
