//! Batch OCR
//!
//! Offline processing of a whole directory of PDFs: full-text recognition,
//! text layer, and a statistics report at the end.

pub mod discover;
pub mod pipeline;
pub mod report;
pub mod types;

pub use discover::{discover_pdfs, preflight};
pub use pipeline::BatchRunner;
pub use report::{group_thousands, log_summary, save_statistics, summary_table, STATISTICS_FILE};
pub use types::{BatchError, BatchOptions, BatchStatistics, FileOutcome, FileReport, FileSuccess};
