//! Final report: statistics file and summary table

use std::path::{Path, PathBuf};

use super::types::{BatchError, BatchOptions, BatchStatistics, FileReport};

/// Name of the statistics report inside the output directory
pub const STATISTICS_FILE: &str = "ocr_statistics.json";

const NAME_WIDTH: usize = 25;
const RULE_WIDTH: usize = 80;

/// Write the statistics as pretty JSON to `output_dir`
pub async fn save_statistics(
    statistics: &BatchStatistics,
    output_dir: &Path,
) -> Result<PathBuf, BatchError> {
    tokio::fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(STATISTICS_FILE);
    let json = serde_json::to_string_pretty(statistics)?;
    tokio::fs::write(&path, json).await?;

    tracing::info!("Statistics saved: {}", path.display());
    Ok(path)
}

/// Format a count with `,` between groups of three digits
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Per-file table with a totals row
pub fn summary_table(statistics: &BatchStatistics) -> Vec<String> {
    let rule = "-".repeat(RULE_WIDTH);
    let mut lines = vec![
        format!(
            "{:<25} {:>8} {:>12} {:>10} {:>10} {:>10}",
            "File", "Pages", "Characters", "Words", "Input MB", "Output MB"
        ),
        rule.clone(),
    ];

    for (name, report) in &statistics.files {
        let name = truncate(name, NAME_WIDTH);
        match report {
            FileReport::Success(file) => {
                let output_mb = file
                    .output_size_mb
                    .map(|mb| format!("{:.1}", mb))
                    .unwrap_or_else(|| "-".to_string());
                lines.push(format!(
                    "{:<25} {:>8} {:>12} {:>10} {:>10.1} {:>10}",
                    name,
                    file.pages,
                    group_thousands(file.characters),
                    group_thousands(file.words),
                    file.input_size_mb,
                    output_mb
                ));
            }
            FileReport::Failed { .. } => {
                lines.push(format!("{:<25} {:>8}", name, "FAILED"));
            }
        }
    }

    lines.push(rule);
    lines.push(format!(
        "{:<25} {:>8} {:>12} {:>10}",
        "TOTAL",
        statistics.total_pages,
        group_thousands(statistics.total_characters),
        group_thousands(statistics.total_words)
    ));
    lines
}

/// Log totals, the summary table and where the outputs went
pub fn log_summary(statistics: &BatchStatistics, options: &BatchOptions, statistics_path: &Path) {
    tracing::info!("Files processed: {}/{}", statistics.successful, statistics.total_files);
    if statistics.failed > 0 {
        tracing::warn!("Files failed: {}", statistics.failed);
    }
    tracing::info!("Total pages: {}", group_thousands(statistics.total_pages));
    tracing::info!("Total characters: {}", group_thousands(statistics.total_characters));
    tracing::info!("Total words: {}", group_thousands(statistics.total_words));

    if !statistics.files.is_empty() {
        for line in summary_table(statistics) {
            tracing::info!("{}", line);
        }
    }

    tracing::info!("Text files: {}", options.output_dir.display());
    if options.text_layer {
        tracing::info!("PDFs with text layer: {}", options.text_layer_dir.display());
    }
    tracing::info!("Statistics: {}", statistics_path.display());
}

fn truncate(name: &str, max_chars: usize) -> String {
    name.chars().take(max_chars).collect()
}
