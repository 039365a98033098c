// Domain Layer - Pure business logic and entities

pub mod artifact;
pub mod error;
pub mod job;
pub mod section;

// Re-exports
pub use artifact::{assemble_artifact, strip_reasoning, validate_artifact};
pub use error::DomainError;
pub use job::{JobId, JobRecord, JobStatus, Provider, MAX_AGE, MIN_AGE};
pub use section::{SectionCursor, SectionDescriptor, SectionId, SectionResult};
