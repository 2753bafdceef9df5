//! Health check endpoints

use std::collections::HashMap;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::jobs::JobStatus;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub engine: &'static str,
    pub engine_available: bool,
    pub jobs: HashMap<JobStatus, usize>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = state.runner().engine();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "ocr-pipeline-server",
        engine: engine.name(),
        engine_available: state.engine_available().await,
        jobs: state.jobs().status_counts().await,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use axum::{routing::get, Router};
    use axum_test::TestServer;

    use super::*;
    use crate::config::Config;
    use crate::jobs::Job;
    use crate::ocr::MockEngine;

    #[tokio::test]
    async fn test_health_reports_engine_and_jobs() {
        let engine = Arc::new(MockEngine::succeeding());
        let state = AppState::new(Config::default(), engine.clone());
        state.jobs().insert(Job::new("a.pdf", "output/a_ocr.pdf")).await;

        let app = Router::new()
            .route("/health", get(health_check))
            .with_state(state);
        let server = TestServer::new(app).unwrap();

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["engine"], "mock");
        assert_eq!(body["engine_available"], true);
        assert_eq!(body["jobs"]["queued"], 1);

        // availability is cached between requests
        server.get("/health").await.assert_status_ok();
        assert_eq!(engine.availability_checks.load(Ordering::SeqCst), 1);
    }
}
