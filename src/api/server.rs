use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::{info, warn};

use super::{
    services::{
        get_download, health, list_downloads, list_qualities, probe_url, submit_download,
    },
    state::AppState,
};
use crate::config::Config;
use crate::provider::YtDlpProvider;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All routes, ready to serve or to drive with `oneshot` in tests
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/downloads", post(submit_download).get(list_downloads))
        .route("/downloads/{job_id}", get(get_download))
        .route("/probe", post(probe_url))
        .route("/qualities", get(list_qualities))
        .route("/health", get(health))
        .with_state(state)
        .layer(RequestDecompressionLayer::new())
}

pub async fn run(config: Config, address: SocketAddr) -> Result<(), AnyError> {
    let provider = YtDlpProvider::from_config(&config.provider);
    info!(
        binary = %config.provider.binary,
        max_concurrent = config.jobs.max_concurrent,
        output_dir = %config.jobs.default_output_dir.display(),
        "Using yt-dlp provider"
    );

    let state = AppState::new(config, Arc::new(provider));
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "tubefetch API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
