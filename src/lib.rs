//! OCR Pipeline
//!
//! Adds a searchable text layer to scanned PDFs. Two front-ends share the
//! OCR core: an HTTP server with background jobs and a batch runner for
//! whole directories.

pub mod batch;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod ocr;
pub mod routes;
pub mod state;
