//! Upload Routes
//!
//! Endpoints:
//! - POST /api/upload - Accept a PDF plus OCR form options and queue a job

use std::path::Path;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum::body::Bytes;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::jobs::Job;
use crate::ocr::{OcrMode, OcrOptions, MAX_OPTIMIZE_LEVEL};
use crate::state::AppState;

/// Stems longer than this are cut
pub const MAX_SAFE_NAME_CHARS: usize = 60;

/// Room for the non-file form fields on top of the upload limit
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Create the upload router
pub fn router(max_upload_bytes: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(body_limit))
}

/// Upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub filename: String,
}

/// Raw OCR form fields as sent by the front-end
#[derive(Debug, Clone)]
pub struct UploadForm {
    pub mode: String,
    pub pages: String,
    pub language: String,
    pub deskew: String,
    pub rotate_pages: String,
    pub remove_background: String,
    pub clean: String,
    pub optimize: String,
}

impl UploadForm {
    pub fn new(default_language: &str) -> Self {
        Self {
            mode: "normal".to_string(),
            pages: String::new(),
            language: default_language.to_string(),
            deskew: "true".to_string(),
            rotate_pages: "false".to_string(),
            remove_background: "false".to_string(),
            clean: "false".to_string(),
            optimize: "1".to_string(),
        }
    }

    /// Store a form field by name; unknown fields are ignored
    pub fn set(&mut self, name: &str, value: String) {
        match name {
            "mode" => self.mode = value,
            "pages" => self.pages = value,
            "language" => self.language = value,
            "deskew" => self.deskew = value,
            "rotate_pages" => self.rotate_pages = value,
            "remove_background" => self.remove_background = value,
            "clean" => self.clean = value,
            "optimize" => self.optimize = value,
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    /// Convert to engine options, rejecting values the engine cannot take
    pub fn into_options(self, jobs: usize) -> Result<OcrOptions> {
        let optimize = self
            .optimize
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|level| *level <= MAX_OPTIMIZE_LEVEL)
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "optimize must be an integer between 0 and {}",
                    MAX_OPTIMIZE_LEVEL
                ))
            })?;

        let options = OcrOptions {
            mode: OcrMode::from_form(&self.mode),
            language: self.language.trim().to_string(),
            deskew: form_bool(&self.deskew),
            rotate_pages: form_bool(&self.rotate_pages),
            remove_background: form_bool(&self.remove_background),
            clean: form_bool(&self.clean),
            optimize,
            pages: self.pages.trim().to_string(),
            jobs,
            ..OcrOptions::default()
        };
        options
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        Ok(options)
    }
}

/// POST /api/upload
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let config = state.config();
    let limit_mb = config.limits.max_upload_mb();

    let mut form = UploadForm::new(&config.ocr.language);
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit_mb))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            let filename = field.file_name().unwrap_or("").to_string();
            if !is_pdf_filename(&filename) {
                return Err(AppError::BadRequest("Only PDF files are accepted.".to_string()));
            }
            let data = field.bytes().await.map_err(|e| multipart_error(e, limit_mb))?;
            tracing::debug!("Read {} bytes of file data for '{}'", data.len(), filename);
            file = Some((filename, data));
        } else {
            let value = field.text().await.map_err(|e| multipart_error(e, limit_mb))?;
            form.set(&name, value);
        }
    }

    let (filename, data) = file.ok_or_else(|| {
        AppError::BadRequest("No file provided. Use field name 'file'".to_string())
    })?;

    if data.len() as u64 > config.limits.max_upload_bytes {
        return Err(too_large(limit_mb));
    }

    let options = form.into_options(config.ocr.jobs)?;

    let safe = safe_name(&filename);
    let output_path = config.paths.output_dir.join(format!("{}_ocr.pdf", safe));
    let job = Job::new(filename.clone(), output_path.clone());
    let job_id = job.id;
    let input_path = config.paths.upload_dir.join(format!("{}_{}.pdf", job_id, safe));

    tokio::fs::write(&input_path, &data).await?;

    state.jobs().insert(job).await;
    state.runner().submit(job_id, input_path, output_path, options);

    tracing::info!(
        job_id = %job_id,
        filename = %filename,
        size = data.len(),
        "Queued OCR job"
    );

    Ok(Json(UploadResponse {
        job_id: job_id.to_string(),
        filename,
    }))
}

fn too_large(limit_mb: u64) -> AppError {
    AppError::PayloadTooLarge(format!("File exceeds {} MB limit.", limit_mb))
}

fn multipart_error(err: MultipartError, limit_mb: u64) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(limit_mb)
    } else {
        tracing::warn!("Failed to read multipart upload: {}", err);
        AppError::BadRequest(err.body_text())
    }
}

fn form_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

/// Check the `.pdf` extension, ignoring case
pub fn is_pdf_filename(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}

/// Filename stem without directory parts, cut to `MAX_SAFE_NAME_CHARS`
pub fn safe_name(filename: &str) -> String {
    let base = filename.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(filename);
    let stem = Path::new(base)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let truncated: String = stem.chars().take(MAX_SAFE_NAME_CHARS).collect();
    if truncated.is_empty() {
        "document".to_string()
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_filename() {
        assert!(is_pdf_filename("scan.pdf"));
        assert!(is_pdf_filename("SCAN.PDF"));
        assert!(!is_pdf_filename("scan.pdf.txt"));
        assert!(!is_pdf_filename("scan"));
        assert!(!is_pdf_filename(""));
    }

    #[test]
    fn test_safe_name() {
        assert_eq!(safe_name("Rechnung 2024.pdf"), "Rechnung 2024");
        assert_eq!(safe_name("../../etc/passwd.pdf"), "passwd");
        assert_eq!(safe_name("C:\\Users\\me\\scan.PDF"), "scan");
        assert_eq!(safe_name(".pdf"), ".pdf");

        let long = format!("{}.pdf", "ä".repeat(80));
        assert_eq!(safe_name(&long).chars().count(), MAX_SAFE_NAME_CHARS);
    }

    #[test]
    fn test_form_defaults() {
        let options = UploadForm::new("deu+eng").into_options(1).unwrap();
        assert_eq!(options, OcrOptions::default());
    }

    #[test]
    fn test_form_values() {
        let mut form = UploadForm::new("deu+eng");
        form.set("mode", "redo".to_string());
        form.set("pages", " 2-4 ".to_string());
        form.set("language", "eng".to_string());
        form.set("deskew", "False".to_string());
        form.set("rotate_pages", "TRUE".to_string());
        form.set("clean", "yes".to_string());
        form.set("optimize", "3".to_string());
        form.set("unexpected", "ignored".to_string());

        let options = form.into_options(2).unwrap();
        assert_eq!(options.mode, OcrMode::Redo);
        assert_eq!(options.pages, "2-4");
        assert_eq!(options.language, "eng");
        assert!(!options.deskew);
        assert!(options.rotate_pages);
        assert!(!options.clean);
        assert_eq!(options.optimize, 3);
        assert_eq!(options.jobs, 2);
    }

    #[test]
    fn test_form_rejects_bad_optimize() {
        for value in ["4", "-1", "fast", ""] {
            let mut form = UploadForm::new("deu+eng");
            form.set("optimize", value.to_string());
            assert!(matches!(form.into_options(1), Err(AppError::BadRequest(_))), "{value}");
        }
    }

    #[test]
    fn test_form_rejects_empty_language() {
        let mut form = UploadForm::new("deu+eng");
        form.set("language", "  ".to_string());
        assert!(matches!(form.into_options(1), Err(AppError::BadRequest(_))));
    }
}
