//! Background job execution
//!
//! Each submitted job runs on its own tokio task: mark processing, call
//! the engine, record the outcome, then remove the uploaded input.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use uuid::Uuid;

use super::store::JobStore;
use crate::ocr::{OcrEngine, OcrOptions};

/// Runs OCR jobs against a shared engine and records results in the store
#[derive(Clone)]
pub struct JobRunner {
    store: JobStore,
    engine: Arc<dyn OcrEngine>,
}

impl JobRunner {
    pub fn new(store: JobStore, engine: Arc<dyn OcrEngine>) -> Self {
        Self { store, engine }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        &self.engine
    }

    /// Run a queued job in the background
    pub fn submit(
        &self,
        job_id: Uuid,
        input: PathBuf,
        output: PathBuf,
        options: OcrOptions,
    ) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run(job_id, &input, &output, &options).await })
    }

    /// Run a queued job to completion. The input file is removed afterwards
    /// whether the engine succeeded or not.
    pub async fn run(&self, job_id: Uuid, input: &Path, output: &Path, options: &OcrOptions) {
        if let Err(e) = self.store.mark_processing(job_id).await {
            tracing::warn!(job_id = %job_id, "Cannot start job: {}", e);
            remove_input(input).await;
            return;
        }

        tracing::info!(job_id = %job_id, engine = self.engine.name(), "Job {} processing", job_id);

        match self.engine.ocr(input, output, options).await {
            Ok(()) => {
                let name = output
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if let Err(e) = self.store.mark_done(job_id).await {
                    tracing::warn!(job_id = %job_id, "Failed to record completion: {}", e);
                }
                tracing::info!("Job {} completed: {}", job_id, name);
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(store_err) = self.store.mark_failed(job_id, message.clone()).await {
                    tracing::warn!(job_id = %job_id, "Failed to record failure: {}", store_err);
                }
                tracing::error!("Job {} failed: {}", job_id, message);
            }
        }

        remove_input(input).await;
    }
}

async fn remove_input(input: &Path) {
    match tokio::fs::remove_file(input).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %input.display(), "Failed to remove upload: {}", e),
    }
}
