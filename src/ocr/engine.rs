//! OCR Engines
//!
//! The engine trait and the `ocrmypdf` implementation that adds a text
//! layer to a PDF.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use super::types::{tail_lines, EngineExitCode, OcrError, OcrOptions};

/// Lines of stderr kept in engine errors
const STDERR_TAIL_LINES: usize = 10;

/// OCR engine trait
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &'static str;

    /// Check if the engine can be run
    async fn is_available(&self) -> bool;

    /// Run OCR on `input`, writing the searchable PDF to `output`
    async fn ocr(&self, input: &Path, output: &Path, options: &OcrOptions) -> Result<(), OcrError>;
}

/// Check whether an external tool answers `--version`
pub async fn tool_available(binary: &Path) -> bool {
    Command::new(binary)
        .arg("--version")
        .kill_on_drop(true)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Engine wrapping the `ocrmypdf` CLI
pub struct OcrMyPdfEngine {
    binary: PathBuf,
}

impl OcrMyPdfEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for OcrMyPdfEngine {
    fn name(&self) -> &'static str {
        "ocrmypdf"
    }

    async fn is_available(&self) -> bool {
        tool_available(&self.binary).await
    }

    #[tracing::instrument(level = "debug", skip_all, fields(input = %input.display()))]
    async fn ocr(&self, input: &Path, output: &Path, options: &OcrOptions) -> Result<(), OcrError> {
        let args = options.to_args(input, output)?;
        tracing::debug!(?args, "Running ocrmypdf");

        let result = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    OcrError::ToolNotAvailable(self.binary.display().to_string())
                } else {
                    OcrError::Spawn {
                        tool: self.binary.display().to_string(),
                        source,
                    }
                }
            })?;

        let code = EngineExitCode::from_status(result.status);
        if !code.is_ok() {
            return Err(OcrError::Engine {
                code,
                stderr: tail_lines(&result.stderr, STDERR_TAIL_LINES),
            });
        }

        Ok(())
    }
}

/// Mock engine for testing
///
/// Writes a stub PDF to the output path and, when a sidecar is requested,
/// two pages of text separated by a form feed.
#[cfg(test)]
pub struct MockEngine {
    pub fail_with: Option<String>,
    pub calls: std::sync::Mutex<Vec<OcrOptions>>,
    pub availability_checks: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockEngine {
    pub const SIDECAR_TEXT: &'static str = "erste Seite\x0csecond page text";

    pub fn succeeding() -> Self {
        Self {
            fail_with: None,
            calls: std::sync::Mutex::new(Vec::new()),
            availability_checks: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            calls: std::sync::Mutex::new(Vec::new()),
            availability_checks: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl OcrEngine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        self.availability_checks
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        true
    }

    async fn ocr(&self, input: &Path, output: &Path, options: &OcrOptions) -> Result<(), OcrError> {
        options.validate()?;
        self.calls.lock().unwrap().push(options.clone());

        if let Some(message) = &self.fail_with {
            return Err(OcrError::Engine {
                code: EngineExitCode::InputFile,
                stderr: message.clone(),
            });
        }

        tokio::fs::metadata(input).await?;
        tokio::fs::write(output, b"%PDF-1.4\n% mock output\n").await?;
        if let Some(sidecar) = &options.sidecar {
            tokio::fs::write(sidecar, Self::SIDECAR_TEXT).await?;
        }
        Ok(())
    }
}
