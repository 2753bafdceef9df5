//! OCR Module
//!
//! Thin wrappers around external OCR tools:
//! - `ocrmypdf` adds a searchable text layer to a PDF
//! - `tesseract` (fed by `pdftoppm`) recognizes full-page text
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ocr_pipeline::ocr::{OcrEngine, OcrMyPdfEngine, OcrOptions};
//!
//! let engine = OcrMyPdfEngine::new("ocrmypdf");
//! engine.ocr(&input, &output, &OcrOptions::default()).await?;
//! ```

mod engine;
mod recognizer;
mod stats;
mod types;

pub use engine::{tool_available, OcrEngine, OcrMyPdfEngine};
pub use recognizer::{RecognizedText, TesseractRecognizer, TextRecognizer, DEFAULT_DPI};
pub use stats::TextStats;
pub use types::{EngineExitCode, OcrError, OcrMode, OcrOptions, DEFAULT_LANGUAGE, MAX_OPTIMIZE_LEVEL};

#[cfg(test)]
pub(crate) use engine::MockEngine;
#[cfg(test)]
pub(crate) use recognizer::MockRecognizer;
