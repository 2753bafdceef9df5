//! Input discovery and tool checks

use std::path::{Path, PathBuf};

use super::types::BatchError;
use crate::ocr::tool_available;

/// Sorted list of PDF files directly inside `dir`
pub async fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !tokio::fs::try_exists(dir).await? {
        return Err(BatchError::InputDirMissing(dir.to_path_buf()));
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut pdfs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !has_pdf_extension(&path) {
            continue;
        }
        // follows symlinks; dangling links are skipped
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => pdfs.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
        }
    }
    pdfs.sort();

    Ok(pdfs)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Check that every external tool runs. Missing tools are logged, not fatal.
///
/// Returns `true` when all tools are available.
pub async fn preflight(tools: &[(&str, &Path)]) -> bool {
    let mut all_available = true;
    for (name, binary) in tools {
        if tool_available(binary).await {
            tracing::info!("  {} found ({})", name, binary.display());
        } else {
            tracing::warn!("  {} not found at {}", name, binary.display());
            all_available = false;
        }
    }
    all_available
}
