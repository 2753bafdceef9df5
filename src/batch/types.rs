//! Batch types

use std::path::PathBuf;

use serde::{Serialize, Serializer};

use crate::ocr::{OcrError, OcrMode, TextStats, DEFAULT_DPI, DEFAULT_LANGUAGE};

const MIB: f64 = 1024.0 * 1024.0;

/// Settings for one batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    /// Recognized text and the statistics report
    pub output_dir: PathBuf,
    /// PDFs with an added text layer
    pub text_layer_dir: PathBuf,
    pub language: String,
    /// Files processed at the same time
    pub workers: usize,
    pub dpi: u32,
    /// Engine mode for the text layer pass
    pub mode: OcrMode,
    /// Run the full-text recognition pass
    pub recognize: bool,
    /// Run the text layer pass
    pub text_layer: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            text_layer_dir: PathBuf::from("output_with_text_layer"),
            language: DEFAULT_LANGUAGE.to_string(),
            workers: 5,
            dpi: DEFAULT_DPI,
            mode: OcrMode::Force,
            recognize: true,
            text_layer: true,
        }
    }
}

/// Per-file entry of the statistics report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileReport {
    Success(FileSuccess),
    Failed { error: String },
}

/// Details of a successfully processed file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSuccess {
    pub input_file: String,
    pub input_size_mb: f64,
    pub pages: usize,
    pub characters: usize,
    pub words: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_pdf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size_mb: Option<f64>,
}

/// Result of processing one file, keyed by its stem
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub name: String,
    pub report: FileReport,
    pub stats: TextStats,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.report, FileReport::Success(_))
    }
}

/// Aggregated statistics of a batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchStatistics {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_characters: usize,
    pub total_words: usize,
    pub total_pages: usize,
    /// Per-file reports in discovery order, written as a JSON object
    #[serde(serialize_with = "serialize_files")]
    pub files: Vec<(String, FileReport)>,
}

impl BatchStatistics {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Self::default()
        }
    }

    /// Add one file. Only successful files count towards the totals.
    pub fn record(&mut self, outcome: FileOutcome) {
        if outcome.is_success() {
            self.successful += 1;
            self.total_characters += outcome.stats.characters;
            self.total_words += outcome.stats.words;
            self.total_pages += outcome.stats.pages;
        } else {
            self.failed += 1;
        }
        self.files.push((outcome.name, outcome.report));
    }

    /// Report for one file by its key
    pub fn file(&self, name: &str) -> Option<&FileReport> {
        self.files
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, report)| report)
    }

    pub fn totals(&self) -> TextStats {
        TextStats {
            characters: self.total_characters,
            words: self.total_words,
            pages: self.total_pages,
        }
    }
}

fn serialize_files<S: Serializer>(
    files: &[(String, FileReport)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(files.iter().map(|(name, report)| (name, report)))
}

/// Bytes to megabytes, rounded to one decimal
pub fn size_mb(bytes: u64) -> f64 {
    (bytes as f64 / MIB * 10.0).round() / 10.0
}

/// Errors that abort a whole batch run
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Input directory not found: {0}")]
    InputDirMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize statistics: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that fail a single file
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
