//! Batch pipeline
//!
//! For every PDF in the input directory: recognize the full text, write it
//! next to the other outputs, then let the engine add a text layer. Files
//! run concurrently up to the worker limit; results come back in input
//! order and a failure only affects its own file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use super::discover::discover_pdfs;
use super::report::group_thousands;
use super::types::{
    size_mb, BatchError, BatchOptions, BatchStatistics, FileError, FileOutcome, FileReport,
    FileSuccess,
};
use crate::ocr::{OcrEngine, OcrOptions, TextRecognizer, TextStats};

/// Runs a batch over one input directory
pub struct BatchRunner {
    options: BatchOptions,
    recognizer: Arc<dyn TextRecognizer>,
    engine: Arc<dyn OcrEngine>,
}

impl BatchRunner {
    pub fn new(
        options: BatchOptions,
        recognizer: Arc<dyn TextRecognizer>,
        engine: Arc<dyn OcrEngine>,
    ) -> Self {
        Self {
            options,
            recognizer,
            engine,
        }
    }

    /// Process every PDF in the input directory
    pub async fn run(&self) -> Result<BatchStatistics, BatchError> {
        let files = discover_pdfs(&self.options.input_dir).await?;

        if files.is_empty() {
            tracing::warn!("No PDF files found in {}!", self.options.input_dir.display());
            return Ok(BatchStatistics::default());
        }

        tokio::fs::create_dir_all(&self.options.output_dir).await?;
        if self.options.text_layer {
            tokio::fs::create_dir_all(&self.options.text_layer_dir).await?;
        }

        let total = files.len();
        tracing::info!("Found: {} PDF files", total);

        // Outputs are named by stem; a later file with the same stem would
        // overwrite them, also on case-insensitive filesystems.
        let mut stems = HashSet::new();
        let files: Vec<(PathBuf, bool)> = files
            .into_iter()
            .map(|path| {
                let duplicate = !stems.insert(file_stem(&path).to_lowercase());
                (path, duplicate)
            })
            .collect();

        let outcomes: Vec<FileOutcome> = stream::iter(files.into_iter().enumerate())
            .map(|(i, (path, duplicate))| async move {
                if duplicate {
                    duplicate_outcome(&path)
                } else {
                    self.process_file(i + 1, total, path).await
                }
            })
            .buffered(self.options.workers.max(1))
            .collect()
            .await;

        let mut statistics = BatchStatistics::new(total);
        for outcome in outcomes {
            statistics.record(outcome);
        }

        Ok(statistics)
    }

    /// Process one PDF. Errors become a `failed` report for this file.
    pub async fn process_file(&self, index: usize, total: usize, pdf: PathBuf) -> FileOutcome {
        let name = file_stem(&pdf);
        tracing::info!("[{}/{}] Processing: {}", index, total, file_name(&pdf));

        match self.try_process(&pdf, &name).await {
            Ok((success, stats)) => FileOutcome {
                name,
                report: FileReport::Success(success),
                stats,
            },
            Err(e) => {
                tracing::error!("Processing {} failed: {}", file_name(&pdf), e);
                FileOutcome {
                    name,
                    report: FileReport::Failed {
                        error: e.to_string(),
                    },
                    stats: TextStats::default(),
                }
            }
        }
    }

    async fn try_process(&self, pdf: &Path, name: &str) -> Result<(FileSuccess, TextStats), FileError> {
        let input_size = tokio::fs::metadata(pdf).await?.len();
        tracing::info!("  Size: {:.1} MB", size_mb(input_size));

        let text_path = self.options.output_dir.join(format!("{}_tesseract.txt", name));
        let mut stats = None;

        if self.options.recognize {
            let text = self.recognizer.recognize(pdf).await?;
            let recognized = text.stats();
            tokio::fs::write(&text_path, text.joined()).await?;
            tracing::info!(
                "  Text extracted: {} characters, {} words",
                group_thousands(recognized.characters),
                group_thousands(recognized.words)
            );
            stats = Some(recognized);
        }

        let mut output_pdf = None;
        let mut output_size_mb = None;

        if self.options.text_layer {
            let output = self
                .options
                .text_layer_dir
                .join(format!("{}_with_text_layer.pdf", name));
            let options = OcrOptions::text_layer(&self.options.language, self.options.mode, text_path.clone());

            tracing::info!("  Adding text layer...");
            self.engine.ocr(pdf, &output, &options).await?;
            tracing::info!("  Output saved: {}", file_name(&output));

            output_size_mb = Some(size_mb(tokio::fs::metadata(&output).await?.len()));
            output_pdf = Some(file_name(&output));

            if stats.is_none() {
                let sidecar = tokio::fs::read_to_string(&text_path).await?;
                stats = Some(TextStats::from_sidecar(&sidecar));
            }
        }

        let stats = stats.unwrap_or_default();
        let success = FileSuccess {
            input_file: file_name(pdf),
            input_size_mb: size_mb(input_size),
            pages: stats.pages,
            characters: stats.characters,
            words: stats.words,
            output_text: Some(file_name(&text_path)),
            output_pdf,
            output_size_mb,
        };

        Ok((success, stats))
    }
}

/// Failed entry for a file whose outputs would collide with an earlier one.
/// Keyed by the full file name so both entries stay in the report.
fn duplicate_outcome(pdf: &Path) -> FileOutcome {
    let name = file_name(pdf);
    let error = format!(
        "Duplicate output name: another file already uses the stem '{}'",
        file_stem(pdf)
    );
    tracing::error!("Skipping {}: {}", name, error);

    FileOutcome {
        name,
        report: FileReport::Failed { error },
        stats: TextStats::default(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{MockEngine, MockRecognizer, OcrMode};
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        options: BatchOptions,
    }

    fn fixture(files: &[&str]) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let input_dir = temp_dir.path().join("input");
        std::fs::create_dir_all(&input_dir).unwrap();
        for name in files {
            std::fs::write(input_dir.join(name), vec![b'%'; 2048]).unwrap();
        }

        let options = BatchOptions {
            input_dir,
            output_dir: temp_dir.path().join("output"),
            text_layer_dir: temp_dir.path().join("output_with_text_layer"),
            workers: 2,
            ..BatchOptions::default()
        };
        Fixture {
            _temp_dir: temp_dir,
            options,
        }
    }

    fn recognizer(pages: &[&str]) -> Arc<MockRecognizer> {
        Arc::new(MockRecognizer {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            fail: false,
        })
    }

    #[tokio::test]
    async fn test_full_pipeline() {
        let fx = fixture(&["beta.pdf", "alpha.pdf"]);
        let engine = Arc::new(MockEngine::succeeding());
        let runner = BatchRunner::new(
            fx.options.clone(),
            recognizer(&["Hallo Welt", "zweite Seite"]),
            engine.clone(),
        );

        let stats = runner.run().await.unwrap();

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.total_pages, 4);
        assert_eq!(stats.total_words, 8);
        assert_eq!(engine.call_count(), 2);

        let names: Vec<_> = stats.files.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        match stats.file("alpha").unwrap() {
            FileReport::Success(s) => {
                assert_eq!(s.input_file, "alpha.pdf");
                assert_eq!(s.output_text.as_deref(), Some("alpha_tesseract.txt"));
                assert_eq!(s.output_pdf.as_deref(), Some("alpha_with_text_layer.pdf"));
                assert!(s.output_size_mb.is_some());
            }
            other => panic!("unexpected report {:?}", other),
        }

        assert!(fx.options.text_layer_dir.join("alpha_with_text_layer.pdf").exists());
        // the engine's sidecar replaces the recognized text
        let text = std::fs::read_to_string(fx.options.output_dir.join("beta_tesseract.txt")).unwrap();
        assert_eq!(text, MockEngine::SIDECAR_TEXT);

        let calls = engine.calls.lock().unwrap();
        assert!(calls.iter().all(|o| o.mode == OcrMode::Force && o.optimize == 0 && o.jobs == 1));
    }

    #[tokio::test]
    async fn test_text_only_run() {
        let fx = fixture(&["scan.pdf"]);
        let options = BatchOptions {
            text_layer: false,
            ..fx.options.clone()
        };
        let engine = Arc::new(MockEngine::succeeding());
        let runner = BatchRunner::new(options, recognizer(&["eins zwei drei"]), engine.clone());

        let stats = runner.run().await.unwrap();

        assert_eq!(stats.successful, 1);
        assert_eq!(stats.total_words, 3);
        assert_eq!(engine.call_count(), 0);
        let text = std::fs::read_to_string(fx.options.output_dir.join("scan_tesseract.txt")).unwrap();
        assert_eq!(text, "eins zwei drei");
        assert!(!fx.options.text_layer_dir.exists());
    }

    #[tokio::test]
    async fn test_layer_only_counts_sidecar() {
        let fx = fixture(&["scan.pdf"]);
        let options = BatchOptions {
            recognize: false,
            ..fx.options.clone()
        };
        let failing_recognizer = Arc::new(MockRecognizer { pages: vec![], fail: true });
        let runner = BatchRunner::new(options, failing_recognizer, Arc::new(MockEngine::succeeding()));

        let stats = runner.run().await.unwrap();

        assert_eq!(stats.successful, 1);
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.totals(), TextStats::from_sidecar(MockEngine::SIDECAR_TEXT));
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let fx = fixture(&["one.pdf", "two.pdf"]);
        let runner = BatchRunner::new(
            fx.options.clone(),
            recognizer(&["text"]),
            Arc::new(MockEngine::failing("ocrmypdf crashed")),
        );

        let stats = runner.run().await.unwrap();

        assert_eq!(stats.successful, 0);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.total_characters, 0);
        match stats.file("one").unwrap() {
            FileReport::Failed { error } => assert!(error.contains("ocrmypdf crashed")),
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recognition_failure_skips_engine() {
        let fx = fixture(&["bad.pdf"]);
        let engine = Arc::new(MockEngine::succeeding());
        let runner = BatchRunner::new(
            fx.options.clone(),
            Arc::new(MockRecognizer { pages: vec![], fail: true }),
            engine.clone(),
        );

        let stats = runner.run().await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_same_stem_different_case() {
        let fx = fixture(&["scan.pdf", "scan.PDF"]);
        let engine = Arc::new(MockEngine::succeeding());
        let runner = BatchRunner::new(fx.options.clone(), recognizer(&["eine Seite"]), engine.clone());

        let stats = runner.run().await.unwrap();

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.successful, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.files.len(), stats.successful + stats.failed);
        assert_eq!(engine.call_count(), 1);

        // discovery sorts "scan.PDF" before "scan.pdf"
        assert!(matches!(stats.file("scan"), Some(FileReport::Success(s)) if s.input_file == "scan.PDF"));
        match stats.file("scan.pdf").unwrap() {
            FileReport::Failed { error } => assert!(error.contains("Duplicate output name")),
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_report_follows_discovery_order() {
        let fx = fixture(&["a.pdf", "a-b.pdf"]);
        let runner = BatchRunner::new(
            fx.options.clone(),
            recognizer(&["text"]),
            Arc::new(MockEngine::succeeding()),
        );

        let stats = runner.run().await.unwrap();
        let names: Vec<_> = stats.files.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["a-b", "a"]);
    }

    #[tokio::test]
    async fn test_empty_input_dir() {
        let fx = fixture(&[]);
        let runner = BatchRunner::new(
            fx.options.clone(),
            recognizer(&[]),
            Arc::new(MockEngine::succeeding()),
        );

        let stats = runner.run().await.unwrap();
        assert_eq!(stats.total_files, 0);
        assert!(stats.files.is_empty());
    }
}
