//! Text Recognizers
//!
//! Full-text recognition of a PDF, page by page. The tesseract recognizer
//! rasterizes with `pdftoppm` into a scratch directory and runs
//! `tesseract` on each page image in order.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use super::stats::TextStats;
use super::types::{tail_lines, OcrError, DEFAULT_LANGUAGE};

/// Default rasterization resolution
pub const DEFAULT_DPI: u32 = 100;

/// Log a progress line every this many pages
const PROGRESS_INTERVAL: usize = 50;

/// Recognized text, one entry per page
#[derive(Debug, Clone, Default)]
pub struct RecognizedText {
    pub pages: Vec<String>,
}

impl RecognizedText {
    pub fn joined(&self) -> String {
        self.pages.join("\n")
    }

    pub fn stats(&self) -> TextStats {
        TextStats::from_pages(self.pages.as_slice())
    }
}

/// Recognizer trait
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize every page of `pdf`
    async fn recognize(&self, pdf: &Path) -> Result<RecognizedText, OcrError>;
}

/// Tesseract-based recognizer
pub struct TesseractRecognizer {
    tesseract: PathBuf,
    pdftoppm: PathBuf,
    language: String,
    dpi: u32,
}

impl TesseractRecognizer {
    pub fn new(tesseract: impl Into<PathBuf>, pdftoppm: impl Into<PathBuf>) -> Self {
        Self {
            tesseract: tesseract.into(),
            pdftoppm: pdftoppm.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            dpi: DEFAULT_DPI,
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
        let prefix = out_dir.join("page");
        let output = Command::new(&self.pdftoppm)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf)
            .arg(&prefix)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| spawn_error(&self.pdftoppm, source))?;

        if !output.status.success() {
            return Err(OcrError::Recognition(format!(
                "pdftoppm failed: {}",
                tail_lines(&output.stderr, 5)
            )));
        }

        let mut entries = tokio::fs::read_dir(out_dir).await?;
        let mut pages = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(number) = page_number(&path) {
                pages.push((number, path));
            }
        }
        pages.sort_by_key(|(number, _)| *number);

        Ok(pages.into_iter().map(|(_, path)| path).collect())
    }

    async fn recognize_image(&self, image: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.tesseract)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| spawn_error(&self.tesseract, source))?;

        if !output.status.success() {
            return Err(OcrError::Recognition(format!(
                "tesseract failed on {}: {}",
                image.display(),
                tail_lines(&output.stderr, 5)
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    #[tracing::instrument(level = "debug", skip_all, fields(pdf = %pdf.display()))]
    async fn recognize(&self, pdf: &Path) -> Result<RecognizedText, OcrError> {
        let scratch = tempfile::Builder::new().prefix("ocr-pages").tempdir()?;

        tracing::info!("  Converting PDF to images...");
        let images = self.rasterize(pdf, scratch.path()).await?;
        let page_count = images.len();
        tracing::info!("  {} pages found, starting OCR...", page_count);

        let mut pages = Vec::with_capacity(page_count);
        for (i, image) in images.iter().enumerate() {
            let page = i + 1;
            if page % PROGRESS_INTERVAL == 0 {
                tracing::info!("    Page {}/{}...", page, page_count);
            }
            pages.push(self.recognize_image(image).await?);
        }

        Ok(RecognizedText { pages })
    }
}

fn spawn_error(binary: &Path, source: std::io::Error) -> OcrError {
    if source.kind() == std::io::ErrorKind::NotFound {
        OcrError::ToolNotAvailable(binary.display().to_string())
    } else {
        OcrError::Spawn {
            tool: binary.display().to_string(),
            source,
        }
    }
}

/// Page number of a `pdftoppm` output file (`page-07.png` -> 7)
fn page_number(path: &Path) -> Option<u32> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .rsplit('-')
        .next()?
        .parse()
        .ok()
}

/// Mock recognizer for testing
#[cfg(test)]
pub struct MockRecognizer {
    pub pages: Vec<String>,
    pub fail: bool,
}

#[cfg(test)]
#[async_trait]
impl TextRecognizer for MockRecognizer {
    async fn recognize(&self, _pdf: &Path) -> Result<RecognizedText, OcrError> {
        if self.fail {
            return Err(OcrError::Recognition("mock recognition failure".to_string()));
        }
        Ok(RecognizedText {
            pages: self.pages.clone(),
        })
    }
}
