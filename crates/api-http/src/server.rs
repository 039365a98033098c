//! HTTP Server
//!
//! Builds the axum router and serves it until the shutdown future resolves.

use crate::handler::{self, AppState};
use axum::routing::{get, post};
use axum::Router;
use eqgen_core::application::JobManager;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
const DEFAULT_HTTP_PORT: u16 = 5000;

/// HTTP Server Configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
        }
    }
}

/// Router with every endpoint mounted
pub fn router(manager: Arc<JobManager>) -> Router {
    Router::new()
        .route("/generate", post(handler::generate))
        .route("/create-eq-test", post(handler::generate))
        .route("/status/{test_id}", get(handler::status))
        .route("/tests", get(handler::list))
        .route("/health", get(handler::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(manager))
}

/// HTTP Server
pub struct HttpServer {
    listener: TcpListener,
    router: Router,
}

impl HttpServer {
    /// Bind the listening socket
    pub async fn bind(config: &HttpServerConfig, manager: Arc<JobManager>) -> std::io::Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr).await?;
        Ok(Self {
            listener,
            router: router(manager),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` resolves, then let in-flight requests finish
    pub async fn serve<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = %self.listener.local_addr()?, "HTTP server listening");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
