use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod config;
mod handlers;
mod metrics;
mod middleware;
mod server;

pub const APP_TITLE: &str = "Cloud Ready API";

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Request metrics. The timing middleware writes, `/metrics` reads.
    pub metrics: metrics::Registry,
}

impl AppState {
    pub fn new() -> Result<Self, metrics::MetricsError> {
        Ok(Self {
            metrics: metrics::http_registry()?,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = config::Args::parse();

    // ── 1. Build shared state ────────────────────────────────────
    let state = Arc::new(AppState::new().context("failed to register request metrics")?);

    // ── 2. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 3. Bind & serve ──────────────────────────────────────────
    let addr = args.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        version = env!("CARGO_PKG_VERSION"),
        "{APP_TITLE} listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")?;

    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
