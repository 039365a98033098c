//! Daemon configuration loaded from the environment

use anyhow::{anyhow, Context, Result};
use eqgen_api_http::HttpServerConfig;
use eqgen_core::application::RetryPolicy;
use eqgen_core::config::{EngineConfig, GenerationParams, RetentionConfig};
use eqgen_core::domain::Provider;
use eqgen_infra_llm::LlmConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ARTIFACT_DIR: &str = "./tests";

/// Everything the composition root needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub engine: EngineConfig,
    pub llm: LlmConfig,
    pub http: HttpServerConfig,
    pub artifact_dir: PathBuf,
    pub json_logs: bool,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        let engine_defaults = EngineConfig::default();
        let retention_defaults = RetentionConfig::default();
        let retry_defaults = RetryPolicy::default();
        let params_defaults = GenerationParams::default();
        let http_defaults = HttpServerConfig::default();
        let llm_defaults = LlmConfig::default();

        let backend_timeout = Duration::from_secs(
            env.parse("EQGEN_BACKEND_TIMEOUT_SECS", engine_defaults.backend_timeout.as_secs())?,
        );

        let max_workers: usize = env.parse("EQGEN_MAX_WORKERS", engine_defaults.max_workers)?;
        if max_workers == 0 {
            return Err(anyhow!("EQGEN_MAX_WORKERS must be at least 1"));
        }

        let default_provider = match env.get("EQGEN_DEFAULT_PROVIDER") {
            Some(raw) => Provider::from_str(&raw)
                .map_err(|e| anyhow!("Invalid EQGEN_DEFAULT_PROVIDER '{}': {}", raw, e))?,
            None => engine_defaults.default_provider,
        };

        let retention = RetentionConfig {
            retention: Duration::from_secs(
                env.parse::<u64>("EQGEN_RETENTION_HOURS", retention_defaults.retention.as_secs() / 3600)?
                    * 3600,
            ),
            sweep_interval: Duration::from_secs(env.parse(
                "EQGEN_SWEEP_INTERVAL_SECS",
                retention_defaults.sweep_interval.as_secs(),
            )?),
            max_retained_jobs: env.parse("EQGEN_MAX_RETAINED_JOBS", retention_defaults.max_retained_jobs)?,
        };
        if retention.sweep_interval.is_zero() {
            return Err(anyhow!("EQGEN_SWEEP_INTERVAL_SECS must be greater than 0"));
        }

        let engine = EngineConfig {
            max_workers,
            default_provider,
            backend_timeout,
            params: GenerationParams {
                temperature: env.parse("EQGEN_TEMPERATURE", params_defaults.temperature)?,
                top_p: env.parse("EQGEN_TOP_P", params_defaults.top_p)?,
            },
            retry: RetryPolicy {
                max_retries: env.parse("EQGEN_SECTION_RETRIES", retry_defaults.max_retries)?,
                base_delay_ms: env.parse("EQGEN_RETRY_BASE_DELAY_MS", retry_defaults.base_delay_ms)?,
                ..retry_defaults
            },
            retention,
            validate_artifact: env.parse("EQGEN_VALIDATE_ARTIFACT", engine_defaults.validate_artifact)?,
        };

        let llm = LlmConfig {
            ollama_base_url: env.get("OLLAMA_BASE_URL").unwrap_or(llm_defaults.ollama_base_url),
            ollama_model: env.get("OLLAMA_MODEL").unwrap_or(llm_defaults.ollama_model),
            deepseek_api_url: env.get("DEEPSEEK_API_URL").unwrap_or(llm_defaults.deepseek_api_url),
            deepseek_api_key: env.get("DEEPSEEK_API_KEY"),
            deepseek_model: env.get("DEEPSEEK_MODEL").unwrap_or(llm_defaults.deepseek_model),
            request_timeout: backend_timeout,
        };

        let http = HttpServerConfig {
            host: env.get("EQGEN_HOST").unwrap_or(http_defaults.host),
            port: env.parse("EQGEN_PORT", http_defaults.port)?,
        };

        let artifact_dir = env
            .get("EQGEN_ARTIFACT_DIR")
            .unwrap_or_else(|| DEFAULT_ARTIFACT_DIR.to_string());
        let artifact_dir = PathBuf::from(shellexpand::tilde(&artifact_dir).into_owned());

        let json_logs = env
            .get("EQGEN_LOG_FORMAT")
            .is_some_and(|format| format.eq_ignore_ascii_case("json"));

        Ok(Self {
            engine,
            llm,
            http,
            artifact_dir,
            json_logs,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty trimmed value
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse::<T>()
                .map_err(|e| anyhow!("{}", e))
                .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
            None => Ok(default),
        }
    }
}
