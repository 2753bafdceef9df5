//! Job Routes
//!
//! Endpoints:
//! - GET /api/status/:job_id - Current status of a job
//! - GET /api/download/:job_id - Download the OCR result of a finished job

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::jobs::JobStatus;
use crate::state::AppState;

/// Create the job router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status/:job_id", get(job_status))
        .route("/download/:job_id", get(download))
}

/// Status response
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub filename: String,
    pub error: Option<String>,
}

/// GET /api/status/:job_id
async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>> {
    let job = state.jobs().get_by_str(&job_id).await?;

    Ok(Json(JobStatusResponse {
        job_id: job.id.to_string(),
        status: job.status,
        filename: job.filename,
        error: job.error,
    }))
}

/// GET /api/download/:job_id
async fn download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response> {
    let job = state.jobs().get_by_str(&job_id).await?;

    if job.status != JobStatus::Done {
        return Err(AppError::BadRequest("Job not completed yet.".to_string()));
    }

    let data = match tokio::fs::read(&job.output_path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(job_id = %job.id, path = %job.output_path.display(), "Output missing for finished job");
            return Err(AppError::NotFound("Output file not found.".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let content_type = mime_guess::from_path(&job.output_path).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, data.len())
        .header(header::CONTENT_DISPOSITION, attachment_header(&job.output_name))
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn attachment_header(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| if c == '"' || c.is_control() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{}\"", cleaned)
}
