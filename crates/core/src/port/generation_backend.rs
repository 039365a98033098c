// Generation Backend Port
// Abstraction over the services that write one section of a test

use crate::config::GenerationParams;
use crate::domain::{Provider, SectionDescriptor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Backend errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Quota exceeded: {0}")]
    Quota(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),
}

impl BackendError {
    /// Whether a later attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Connection(_) | BackendError::Timeout(_) | BackendError::Quota(_) => true,
            BackendError::Http { status, .. } => *status >= 500,
            BackendError::Auth(_)
            | BackendError::InvalidResponse(_)
            | BackendError::NotConfigured(_) => false,
        }
    }
}

/// Generation Backend trait
///
/// Implementations:
/// - OllamaBackend: local model service
/// - DeepSeekBackend: cloud chat-completions API
///
/// Implementations never retry; retry policy belongs to the section pipeline.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate the text of one section for test takers of `age`
    ///
    /// # Errors
    /// - BackendError::Connection if the service cannot be reached
    /// - BackendError::Timeout if the call exceeds the configured timeout
    /// - BackendError::Auth / Quota for credential or rate-limit rejections
    async fn generate(
        &self,
        section: &SectionDescriptor,
        age: u8,
        params: &GenerationParams,
    ) -> Result<String, BackendError>;

    /// Provider variant this backend implements
    fn provider(&self) -> Provider;

    /// Model identifier for logging
    fn model(&self) -> &str;
}

/// Backends available to the pipeline, keyed by provider
#[derive(Clone, Default)]
pub struct BackendSet {
    backends: HashMap<Provider, Arc<dyn GenerationBackend>>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own provider (replaces any previous one)
    pub fn with(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backends.insert(backend.provider(), backend);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn GenerationBackend>> {
        self.backends.get(&provider).cloned()
    }

    pub fn contains(&self, provider: Provider) -> bool {
        self.backends.contains_key(&provider)
    }

    pub fn providers(&self) -> Vec<Provider> {
        self.backends.keys().copied().collect()
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::SectionId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Well-formed section text that passes artifact validation
    pub fn sample_section_text(section: &SectionDescriptor) -> String {
        let mut text = format!("{}\n", section.header);
        for n in 1..=section.question_count {
            text.push_str(&format!(
                "\nQuestion {n}\n\
                 Scenario & Question: A classmate frowns after reading a message. Which emotions are present?\n\
                 Options:\n\
                 A) Disappointment\n\
                 B) Confusion\n\
                 C) Relief\n\
                 D) Excitement\n\
                 Expert Consensus Scores:\n\
                 A: 5, B: 3, C: 2, D: 1\n"
            ));
        }
        text
    }

    /// Scripted failure for one section
    #[derive(Debug, Clone)]
    struct ScriptedFailure {
        error: BackendError,
        /// None = fail forever
        remaining: Option<usize>,
    }

    /// Mock backend with scripted failures and concurrency tracking
    pub struct MockBackend {
        provider: Provider,
        delay: Duration,
        failures: Mutex<HashMap<SectionId, ScriptedFailure>>,
        panic_on: Option<SectionId>,
        output: Option<String>,
        calls: Mutex<Vec<(SectionId, u8)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockBackend {
        pub fn new(provider: Provider) -> Self {
            Self {
                provider,
                delay: Duration::ZERO,
                failures: Mutex::new(HashMap::new()),
                panic_on: None,
                output: None,
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        /// Sleep this long inside every call
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Always fail `section` with `error`
        pub fn fail_section(self, section: SectionId, error: BackendError) -> Self {
            self.failures.lock().unwrap().insert(
                section,
                ScriptedFailure {
                    error,
                    remaining: None,
                },
            );
            self
        }

        /// Fail `section` the first `times` calls, then succeed
        pub fn fail_section_times(self, section: SectionId, times: usize, error: BackendError) -> Self {
            self.failures.lock().unwrap().insert(
                section,
                ScriptedFailure {
                    error,
                    remaining: Some(times),
                },
            );
            self
        }

        /// Panic while generating `section` (for panic isolation testing)
        pub fn panic_on(mut self, section: SectionId) -> Self {
            self.panic_on = Some(section);
            self
        }

        /// Return this text for every section instead of the sample text
        pub fn with_output(mut self, output: impl Into<String>) -> Self {
            self.output = Some(output.into());
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Sections requested so far, in call order
        pub fn calls(&self) -> Vec<(SectionId, u8)> {
            self.calls.lock().unwrap().clone()
        }

        /// Highest number of calls observed running at once
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        fn scripted_failure(&self, section: SectionId) -> Option<BackendError> {
            let mut failures = self.failures.lock().unwrap();
            let failure = failures.get_mut(&section)?;
            match failure.remaining {
                None => Some(failure.error.clone()),
                Some(0) => None,
                Some(ref mut n) => {
                    *n -= 1;
                    Some(failure.error.clone())
                }
            }
        }
    }

    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl GenerationBackend for MockBackend {
        async fn generate(
            &self,
            section: &SectionDescriptor,
            age: u8,
            _params: &GenerationParams,
        ) -> Result<String, BackendError> {
            self.calls.lock().unwrap().push((section.id, age));

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlight(&self.in_flight);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            if self.panic_on == Some(section.id) {
                panic!("mock backend panicked on {}", section.id);
            }

            if let Some(error) = self.scripted_failure(section.id) {
                return Err(error);
            }

            Ok(self
                .output
                .clone()
                .unwrap_or_else(|| sample_section_text(section)))
        }

        fn provider(&self) -> Provider {
            self.provider
        }

        fn model(&self) -> &str {
            "mock-model"
        }
    }
}
