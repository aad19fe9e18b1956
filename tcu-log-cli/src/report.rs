//! Run summary and JSON report

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tcu_log_decoder::BatchResult;

/// Log the batch totals and every failed file
pub fn log_summary(result: &BatchResult) {
    log::info!(
        "{} files processed, {} failed, {} records written, {} lines skipped",
        result.files_processed,
        result.files_failed(),
        result.records(),
        result.skipped_lines()
    );

    for failure in &result.failures {
        log::error!("  failed: {:?}: {}", failure.source, failure.error);
    }

    for file in result.files.iter().filter(|f| f.stats.skipped_lines > 0) {
        let reasons: Vec<String> = file
            .stats
            .skip_reasons
            .iter()
            .map(|(reason, count)| format!("{}={}", reason, count))
            .collect();
        log::debug!("  {:?}: {}", file.relative, reasons.join(", "));
    }
}

/// Write the batch result as pretty-printed JSON
pub fn write_report(path: &Path, result: &BatchResult) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create report file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result)
        .with_context(|| format!("Failed to write report file: {:?}", path))?;
    writer.flush()?;
    log::info!("Report written to: {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tcu_log_decoder::{FailedFile, FileReport, FileStats, SkipReason};

    #[test]
    fn test_write_report() {
        let mut stats = FileStats::default();
        stats.lines = 3;
        stats.skipped_lines = 1;
        stats.skip_reasons.insert(SkipReason::UnknownFrame, 1);

        let result = BatchResult {
            files_processed: 1,
            files: vec![FileReport {
                source: PathBuf::from("logs/LOGS1/a.txt"),
                relative: PathBuf::from("LOGS1/a.txt"),
                stats,
            }],
            failures: vec![FailedFile {
                source: PathBuf::from("logs/LOGS1/b.txt"),
                error: "permission denied".to_string(),
            }],
        };

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        write_report(&path, &result).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["files_processed"], 1);
        assert_eq!(json["files"][0]["stats"]["skip_reasons"]["unknown_frame"], 1);
        assert_eq!(json["failures"][0]["error"], "permission denied");
    }
}
