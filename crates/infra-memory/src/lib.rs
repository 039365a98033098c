// EQGen Infrastructure - In-Memory Adapter
// Implements: JobRegistry (process-local, lost on restart)

mod job_registry;

pub use job_registry::InMemoryJobRegistry;
