//! Router wiring and the serve loop.

use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::config::AppConfig;
use crate::routes;

pub struct AppState {
    pub config: AppConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/providers", get(routes::providers))
        .route("/api/generate", post(routes::generate))
        .route("/api/analyze", post(routes::analyze))
        .route("/api/build", get(routes::build_report))
        .route("/api/coverage", get(routes::coverage_report))
        .route("/api/download", post(routes::download))
        .with_state(state)
}

pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let listen = config.listen;
    let state = Arc::new(AppState { config });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    info!(%listen, "gtestsmith listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}
