//! EQ Test Generation Engine - Main Entry Point

mod config;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use config::DaemonConfig;
use eqgen_api_http::HttpServer;
use eqgen_core::application::worker::constants::DEFAULT_DRAIN_TIMEOUT;
use eqgen_core::application::{shutdown_channel, JobManager, RetentionSweeper};
use eqgen_core::port::id_provider::UuidProvider;
use eqgen_core::port::time_provider::SystemTimeProvider;
use eqgen_core::port::{ArtifactStore, JobRegistry, TimeProvider};
use eqgen_infra_fs::FsArtifactStore;
use eqgen_infra_llm::build_backends;
use eqgen_infra_memory::InMemoryJobRegistry;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging(json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("eqgen=info,tower_http=info"))
        .context("Failed to create env filter")?;

    let fmt_layer = if json {
        // Production: JSON structured logging
        fmt::layer().json().boxed()
    } else {
        // Development: Pretty formatting with colors
        fmt::layer().pretty().boxed()
    };

    tracing_subscriber::registry()
        .with(telemetry::otel_layer()?)
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration (.env first, real environment wins)
    let dotenv = dotenvy::dotenv();
    let config = DaemonConfig::from_env()?;

    // 2. Initialize logging
    init_logging(config.json_logs)?;
    info!("EQ Test Generation Engine v{} starting...", VERSION);
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded .env file");
    }

    // 3. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new(
        Arc::new(UuidProvider),
        Arc::clone(&time_provider),
    ));
    info!(dir = %config.artifact_dir.display(), "Artifacts will be stored on disk");
    let artifacts: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(&config.artifact_dir));
    let backends = build_backends(&config.llm).context("Backend initialization failed")?;

    let manager = Arc::new(JobManager::start(
        &config.engine,
        Arc::clone(&registry),
        backends,
        Arc::clone(&artifacts),
        Arc::clone(&time_provider),
    ));
    if !manager.is_available(manager.default_provider()) {
        warn!(
            provider = %manager.default_provider(),
            "Default provider has no backend, requests must name a provider explicitly"
        );
    }

    // 4. Start retention sweeper
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let sweeper = RetentionSweeper::new(
        registry,
        artifacts,
        time_provider,
        config.engine.retention.clone(),
    );
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown_rx));

    // 5. Start HTTP server
    let server = HttpServer::bind(&config.http, Arc::clone(&manager))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.http.host, config.http.port))?;

    info!("System ready. Waiting for requests...");
    info!("Press Ctrl+C to shutdown");

    // 6. Serve until Ctrl+C
    let serve_result = server
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = ?e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received. Exiting gracefully...");
        })
        .await;
    if let Err(e) = &serve_result {
        error!(error = ?e, "HTTP server failed");
    }

    // 7. Graceful shutdown
    shutdown_tx.shutdown();
    if let Err(e) = sweeper_handle.await {
        warn!(error = ?e, "Sweeper task ended abnormally");
    }

    match tokio::time::timeout(DEFAULT_DRAIN_TIMEOUT, manager.shutdown()).await {
        Ok(()) => info!("Worker pool drained"),
        Err(_) => {
            warn!(
                timeout_secs = DEFAULT_DRAIN_TIMEOUT.as_secs(),
                "Drain timed out, aborting remaining jobs"
            );
            manager.abort().await?;
        }
    }

    telemetry::shutdown();
    info!("Shutdown complete.");

    serve_result.context("HTTP server failed")
}
