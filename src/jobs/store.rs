//! In-memory job store
//!
//! Jobs live only for the lifetime of the process. Nothing is persisted,
//! evicted, or reconciled with files on disk.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{Job, JobError, JobStatus};

/// Shared handle to the job table
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job
    pub async fn insert(&self, job: Job) {
        tracing::debug!(job_id = %job.id, filename = %job.filename, "Registered job");
        self.jobs.write().await.insert(job.id, job);
    }

    /// Get a job by ID
    pub async fn get(&self, id: Uuid) -> Result<Job, JobError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    /// Get a job by its string ID
    pub async fn get_by_str(&self, id: &str) -> Result<Job, JobError> {
        let uuid = Uuid::parse_str(id).map_err(|_| JobError::NotFound(id.to_string()))?;
        self.get(uuid).await
    }

    pub async fn mark_processing(&self, id: Uuid) -> Result<Job, JobError> {
        self.transition(id, JobStatus::Processing, None).await
    }

    pub async fn mark_done(&self, id: Uuid) -> Result<Job, JobError> {
        self.transition(id, JobStatus::Done, None).await
    }

    pub async fn mark_failed(&self, id: Uuid, error: impl Into<String>) -> Result<Job, JobError> {
        self.transition(id, JobStatus::Error, Some(error.into())).await
    }

    async fn transition(
        &self,
        id: Uuid,
        next: JobStatus,
        error: Option<String>,
    ) -> Result<Job, JobError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        if !job.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                id,
                from: job.status,
                to: next,
            });
        }

        job.status = next;
        job.error = error;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Count jobs per status
    pub async fn status_counts(&self) -> HashMap<JobStatus, usize> {
        let jobs = self.jobs.read().await;
        let mut counts = HashMap::new();
        for job in jobs.values() {
            *counts.entry(job.status).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_job() -> (JobStore, Job) {
        let store = JobStore::new();
        let job = Job::new("report.pdf", "output/report_ocr.pdf");
        store.insert(job.clone()).await;
        (store, job)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (store, job) = store_with_job().await;

        let found = store.get(job.id).await.unwrap();
        assert_eq!(found.filename, "report.pdf");
        assert_eq!(found.status, JobStatus::Queued);

        let by_str = store.get_by_str(&job.id.to_string()).await.unwrap();
        assert_eq!(by_str.id, job.id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let store = JobStore::new();
        assert!(matches!(store.get(Uuid::new_v4()).await, Err(JobError::NotFound(_))));
        assert!(matches!(store.get_by_str("not-a-uuid").await, Err(JobError::NotFound(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_lifecycle_success() {
        let (store, job) = store_with_job().await;

        let processing = store.mark_processing(job.id).await.unwrap();
        assert_eq!(processing.status, JobStatus::Processing);

        let done = store.mark_done(job.id).await.unwrap();
        assert_eq!(done.status, JobStatus::Done);
        assert!(done.error.is_none());
        assert!(done.updated_at >= done.created_at);
    }

    #[tokio::test]
    async fn test_lifecycle_failure_keeps_message() {
        let (store, job) = store_with_job().await;
        store.mark_processing(job.id).await.unwrap();

        let failed = store.mark_failed(job.id, "encrypted PDF").await.unwrap();
        assert_eq!(failed.status, JobStatus::Error);
        assert_eq!(failed.error.as_deref(), Some("encrypted PDF"));
    }

    #[tokio::test]
    async fn test_terminal_jobs_do_not_change() {
        let (store, job) = store_with_job().await;

        // queued -> done skips processing
        assert!(matches!(
            store.mark_done(job.id).await,
            Err(JobError::InvalidTransition { .. })
        ));

        store.mark_processing(job.id).await.unwrap();
        store.mark_done(job.id).await.unwrap();
        assert!(store.mark_failed(job.id, "late").await.is_err());
        assert_eq!(store.get(job.id).await.unwrap().status, JobStatus::Done);
    }

    #[tokio::test]
    async fn test_status_counts() {
        let (store, job) = store_with_job().await;
        store.insert(Job::new("other.pdf", "output/other_ocr.pdf")).await;
        store.mark_processing(job.id).await.unwrap();

        let counts = store.status_counts().await;
        assert_eq!(counts.get(&JobStatus::Queued), Some(&1));
        assert_eq!(counts.get(&JobStatus::Processing), Some(&1));
    }
}
