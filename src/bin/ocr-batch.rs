//! OCR Batch
//!
//! Processes every PDF in a directory: full-text recognition with
//! tesseract, a text layer with ocrmypdf, and a statistics report.
//!
//! Usage:
//!   ocr-batch                               Process ./input into ./output
//!   ocr-batch --input scans --workers 8     Custom input, more parallelism
//!   ocr-batch --skip-text-layer             Text files only

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use ocr_pipeline::batch::{self, BatchOptions, BatchRunner};
use ocr_pipeline::logging;
use ocr_pipeline::ocr::{OcrMode, OcrMyPdfEngine, TesseractRecognizer, DEFAULT_DPI, DEFAULT_LANGUAGE};

const RULE_WIDTH: usize = 80;

#[derive(Parser, Debug)]
#[command(name = "ocr-batch", version, about = "Batch OCR for a directory of PDFs")]
struct Args {
    /// Directory with the PDFs to process
    #[arg(long, env = "OCR_INPUT_DIR", default_value = "input")]
    input: PathBuf,

    /// Directory for text files and the statistics report
    #[arg(long, env = "OCR_OUTPUT_DIR", default_value = "output")]
    output: PathBuf,

    /// Directory for PDFs with an added text layer
    #[arg(long, env = "OCR_TEXT_LAYER_DIR", default_value = "output_with_text_layer")]
    text_layer_output: PathBuf,

    /// Directory for the log file
    #[arg(long, env = "OCR_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Tesseract language(s), e.g. deu+eng
    #[arg(long, env = "OCR_LANGUAGE", default_value = DEFAULT_LANGUAGE)]
    language: String,

    /// Files processed at the same time
    #[arg(long, env = "OCR_WORKERS", default_value_t = 5)]
    workers: usize,

    /// Rasterization resolution for recognition
    #[arg(long, env = "OCR_DPI", default_value_t = DEFAULT_DPI)]
    dpi: u32,

    /// ocrmypdf mode for the text layer
    #[arg(long, env = "OCR_MODE", default_value = "force", value_parser = ["normal", "force", "skip", "redo"])]
    mode: String,

    /// Skip full-text recognition and count the ocrmypdf sidecar instead
    #[arg(long, conflicts_with = "skip_text_layer")]
    skip_recognition: bool,

    /// Only extract text, do not create PDFs with a text layer
    #[arg(long)]
    skip_text_layer: bool,

    #[arg(long, env = "OCRMYPDF_BIN", default_value = "ocrmypdf")]
    ocrmypdf_bin: PathBuf,

    #[arg(long, env = "TESSERACT_BIN", default_value = "tesseract")]
    tesseract_bin: PathBuf,

    #[arg(long, env = "PDFTOPPM_BIN", default_value = "pdftoppm")]
    pdftoppm_bin: PathBuf,
}

impl Args {
    fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            input_dir: self.input.clone(),
            output_dir: self.output.clone(),
            text_layer_dir: self.text_layer_output.clone(),
            language: self.language.clone(),
            workers: self.workers.max(1),
            dpi: self.dpi,
            mode: OcrMode::from_form(&self.mode),
            recognize: !self.skip_recognition,
            text_layer: !self.skip_text_layer,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let (_guard, log_path) = match logging::init_batch_logging(&args.log_dir) {
        Ok(initialized) => initialized,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        result = run(args, &log_path) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("Fatal error: {:#}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted by user");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, log_path: &Path) -> anyhow::Result<()> {
    let started = Instant::now();
    let options = args.batch_options();

    tracing::info!("OCR Batch v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Log file: {}", log_path.display());

    section("1. PREFLIGHT");
    let mut tools: Vec<(&str, &Path)> = Vec::new();
    if options.recognize {
        tools.push(("pdftoppm", args.pdftoppm_bin.as_path()));
        tools.push(("tesseract", args.tesseract_bin.as_path()));
    }
    if options.text_layer {
        tools.push(("ocrmypdf", args.ocrmypdf_bin.as_path()));
    }
    if !batch::preflight(&tools).await {
        tracing::warn!("Some OCR tools are missing, affected files will fail");
    }

    section("2. OCR PROCESSING");
    tracing::info!("Input: {}", options.input_dir.display());
    tracing::info!("Language: {}, workers: {}, mode: {}", options.language, options.workers, args.mode);

    let recognizer = TesseractRecognizer::new(&args.tesseract_bin, &args.pdftoppm_bin)
        .with_language(&options.language)
        .with_dpi(options.dpi);
    let engine = OcrMyPdfEngine::new(&args.ocrmypdf_bin);
    let runner = BatchRunner::new(options.clone(), Arc::new(recognizer), Arc::new(engine));

    let statistics = runner.run().await?;

    section("3. FINAL REPORT");
    let statistics_path = batch::save_statistics(&statistics, &options.output_dir).await?;
    batch::log_summary(&statistics, &options, &statistics_path);
    tracing::info!("Finished in {:.1}s", started.elapsed().as_secs_f64());

    Ok(())
}

fn section(title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    tracing::info!("{}", rule);
    tracing::info!("{}", title);
    tracing::info!("{}", rule);
}
