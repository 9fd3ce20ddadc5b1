//! HTTP surface: `GET /`, `GET /api/health` and `POST /api/upload`.

pub mod error;
pub mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Upload size cap when none is configured: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Settings fixed at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_owned(),
            port: 8000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builds the application router.
///
/// CORS accepts any origin, method and header and allows credentials by
/// mirroring the request origin.
pub fn router(config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/health", get(handlers::health))
        .route("/api/upload", post(handlers::upload))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serves until Ctrl-C.
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.address()).await?;
    let address: SocketAddr = listener.local_addr()?;
    info!(%address, max_upload_bytes = config.max_upload_bytes, "server listening");
    axum::serve(listener, router(&config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
