// Worker pool constants (no magic values)
use std::time::Duration;

/// Default number of concurrently running pipelines
pub const DEFAULT_MAX_WORKERS: usize = 3;

/// Default upper bound on draining in-flight jobs at shutdown
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Reason recorded on jobs interrupted by shutdown
pub const SHUTDOWN_FAILURE_REASON: &str = "Generation cancelled by shutdown";

/// Reason recorded on jobs whose pipeline panicked
pub const PANIC_FAILURE_REASON: &str = "Internal error during generation";
