// Application Layer - Use Cases and Business Logic

pub mod job_manager;
pub mod pipeline;
pub mod retry;
pub mod sweeper;
pub mod worker;

// Re-exports
pub use job_manager::JobManager;
pub use pipeline::SectionPipeline;
pub use retry::{RetryDecision, RetryPolicy};
pub use sweeper::{RetentionSweeper, SweepReport};
pub use worker::{shutdown_channel, JobRunner, ShutdownSender, ShutdownToken, WorkerPool};
