//! OCR Pipeline Server
//!
//! Web front-end for adding a text layer to scanned PDFs. Uploads become
//! background jobs that run ocrmypdf; clients poll the status and download
//! the result.

use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocr_pipeline::config::Config;
use ocr_pipeline::ocr::{OcrEngine, OcrMyPdfEngine};
use ocr_pipeline::routes;
use ocr_pipeline::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_pipeline=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting OCR Pipeline Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Upload directory: {}", config.paths.upload_dir.display());
    tracing::info!("Output directory: {}", config.paths.output_dir.display());
    tracing::info!("Upload limit: {} MB", config.limits.max_upload_mb());

    config.ensure_dirs()?;

    let addr = config.socket_addr()?;
    let ocrmypdf_bin = config.ocr.ocrmypdf_bin.clone();
    let engine: Arc<dyn OcrEngine> = Arc::new(OcrMyPdfEngine::new(&ocrmypdf_bin));
    let state = AppState::new(config, engine.clone());

    // also primes the cached availability used by /health
    if state.engine_available().await {
        tracing::info!("OCR engine: {} ({})", engine.name(), ocrmypdf_bin.display());
    } else {
        tracing::warn!(
            "{} not found at {}, OCR jobs will fail until it is installed",
            engine.name(),
            ocrmypdf_bin.display()
        );
    }

    let app = routes::app(state);

    tracing::info!("OCR Pipeline Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
