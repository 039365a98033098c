// Section retry policy
use crate::port::BackendError;
use std::time::Duration;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the section after this delay
    Retry(Duration),
    /// Do not retry, the section has failed permanently
    GiveUp,
}

/// Retry policy for backend calls
///
/// Only retryable backend errors (see `BackendError::is_retryable`) are retried.
/// Backoff formula:
/// delay = base_delay * (backoff_factor ^ attempt) * jitter(0.9..=1.1)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one (0 = single attempt)
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 1000,
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            ..Self::default()
        }
    }

    /// Decide whether a failed attempt should be retried
    ///
    /// `attempt` is the zero-based index of the attempt that just failed.
    pub fn should_retry(&self, job_id: &str, attempt: u32, error: &BackendError) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::GiveUp;
        }

        if attempt >= self.max_retries {
            warn!(
                job_id = %job_id,
                attempts = attempt + 1,
                max_retries = self.max_retries,
                "Max retry attempts reached"
            );
            return RetryDecision::GiveUp;
        }

        let base = self.base_delay_ms as f64 * self.backoff_factor.powi(attempt as i32);

        // Deterministic jitter seeded from the job id
        let jitter_seed = job_id.chars().map(|c| c as u32).sum::<u32>();
        let jitter_factor = 0.9 + ((jitter_seed % 21) as f64 / 100.0);

        let delay = Duration::from_millis((base * jitter_factor) as u64);

        info!(
            job_id = %job_id,
            attempt = attempt + 1,
            max_retries = self.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Scheduling section retry"
        );

        RetryDecision::Retry(delay)
    }
}
