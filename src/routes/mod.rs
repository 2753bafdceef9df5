//! Route modules for the OCR Pipeline server

pub mod health;
pub mod jobs;
pub mod static_files;
pub mod upload;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the complete application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let config = state.config();
    let api = upload::router(config.limits.max_upload_bytes).merge(jobs::router());
    let static_service = static_files::service(&config.paths.static_dir);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/health", get(health::health_check))
        .nest("/api", api)
        .fallback_service(static_service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
