//! Application state management

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::config::Config;
use crate::jobs::{JobRunner, JobStore};
use crate::ocr::OcrEngine;

/// How long an engine availability check stays valid
pub const ENGINE_CHECK_TTL: Duration = Duration::from_secs(60);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    runner: JobRunner,
    engine_check: Mutex<Option<(Instant, bool)>>,
}

impl AppState {
    /// Create a new application state around an OCR engine
    pub fn new(config: Config, engine: Arc<dyn OcrEngine>) -> Self {
        let runner = JobRunner::new(JobStore::new(), engine);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                runner,
                engine_check: Mutex::new(None),
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the job store
    pub fn jobs(&self) -> &JobStore {
        self.inner.runner.store()
    }

    /// Get the background job runner
    pub fn runner(&self) -> &JobRunner {
        &self.inner.runner
    }

    /// Engine availability, re-checked at most once per [`ENGINE_CHECK_TTL`]
    pub async fn engine_available(&self) -> bool {
        let mut check = self.inner.engine_check.lock().await;
        if let Some((checked_at, available)) = *check {
            if checked_at.elapsed() < ENGINE_CHECK_TTL {
                return available;
            }
        }

        let available = self.runner().engine().is_available().await;
        *check = Some((Instant::now(), available));
        available
    }
}
