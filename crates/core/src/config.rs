// Engine Configuration
//
// Built once at startup and shared read-only by every component.

use crate::application::retry::RetryPolicy;
use crate::application::worker::constants::DEFAULT_MAX_WORKERS;
use crate::domain::Provider;
use std::time::Duration;

/// Sampling parameters forwarded to every backend call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

/// Retention configuration for the sweeper
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Terminal jobs older than this (by completion time) are discarded
    pub retention: Duration,

    /// How often the sweeper runs
    pub sweep_interval: Duration,

    /// Upper bound on stored jobs; oldest terminal jobs are evicted beyond it
    pub max_retained_jobs: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(24 * 60 * 60), // 24 hours
            sweep_interval: Duration::from_secs(10 * 60),
            max_retained_jobs: 100,
        }
    }
}

/// Immutable engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of pipelines running at once
    pub max_workers: usize,

    /// Provider used when a request does not name one
    pub default_provider: Provider,

    /// Upper bound for a single backend call
    pub backend_timeout: Duration,

    pub params: GenerationParams,
    pub retry: RetryPolicy,
    pub retention: RetentionConfig,

    /// Check the assembled test layout before persisting it
    pub validate_artifact: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            default_provider: Provider::Local,
            backend_timeout: Duration::from_secs(300),
            params: GenerationParams::default(),
            retry: RetryPolicy::default(),
            retention: RetentionConfig::default(),
            validate_artifact: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
        assert_eq!(config.default_provider, Provider::Local);
        assert_eq!(config.backend_timeout, Duration::from_secs(300));
        assert_eq!(config.retention.retention, Duration::from_secs(86_400));
        assert_eq!(config.retention.max_retained_jobs, 100);
        assert!(config.validate_artifact);
    }
}
