//! OCR job tracking for the web service
//!
//! - `types`: job record and status lifecycle
//! - `store`: in-memory job table
//! - `runner`: background execution against an `OcrEngine`

pub mod runner;
pub mod store;
pub mod types;

pub use runner::JobRunner;
pub use store::JobStore;
pub use types::{Job, JobError, JobStatus};
