//! Batch orchestration
//!
//! Discovers input logs under a root, mirrors their relative paths under the
//! output root, and runs one [`FileProcessor`] job per file. Jobs share only
//! the read-only catalog, so they run sequentially or on a rayon pool with no
//! coordination. A failing file is logged and counted; it never stops the
//! batch.

use crate::config::{BatchConfig, Discovery};
use crate::processor::{FileJob, FileProcessor, FileStats};
use crate::signals::MessageCatalog;
use crate::types::{DecoderError, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Outcome of a single file that completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub relative: PathBuf,
    pub stats: FileStats,
}

/// A file that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub source: PathBuf,
    pub error: String,
}

/// Aggregate outcome of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// Files that completed without error
    pub files_processed: usize,
    /// Per-file counts for every processed file, in discovery order
    pub files: Vec<FileReport>,
    /// Files that failed, with the reason
    pub failures: Vec<FailedFile>,
}

impl BatchResult {
    pub fn files_failed(&self) -> usize {
        self.failures.len()
    }

    /// Skipped lines summed over all processed files
    pub fn skipped_lines(&self) -> usize {
        self.files.iter().map(|f| f.stats.skipped_lines).sum()
    }

    /// Parsed records summed over all processed files
    pub fn records(&self) -> usize {
        self.files.iter().map(|f| f.stats.records).sum()
    }
}

/// Drives a batch of file jobs against one shared catalog
pub struct BatchOrchestrator<'a, C: MessageCatalog> {
    catalog: &'a C,
    config: BatchConfig,
}

impl<'a, C: MessageCatalog> BatchOrchestrator<'a, C> {
    pub fn new(catalog: &'a C, config: BatchConfig) -> Self {
        Self { catalog, config }
    }

    /// Discover inputs under `root` and process all of them
    ///
    /// Errors are returned only for batch-level problems (missing root, no
    /// inputs, worker pool failure). Per-file errors end up in
    /// [`BatchResult::failures`].
    pub fn run(&self, root: &Path) -> Result<BatchResult> {
        let jobs = self.discover(root)?;
        log::info!("Found {} input files under {:?}", jobs.len(), root);
        self.run_jobs(&jobs)
    }

    /// Build one job per input file found under `root`
    ///
    /// A root that is itself a file yields a single job named after the file.
    pub fn discover(&self, root: &Path) -> Result<Vec<FileJob>> {
        if !root.exists() {
            return Err(DecoderError::InputNotFound(root.to_path_buf()));
        }

        let sources = if root.is_file() {
            vec![root.to_path_buf()]
        } else {
            match &self.config.discovery {
                Discovery::LogFolders { prefix } => self.discover_log_folders(root, prefix)?,
                Discovery::Recursive => self.discover_recursive(root),
            }
        };

        if sources.is_empty() {
            return Err(DecoderError::NoInputs(root.to_path_buf()));
        }

        let extension = &self.config.pipeline.output_extension;
        Ok(sources
            .into_iter()
            .map(|source| {
                let relative = relative_path(root, &source);
                FileJob::new(source, relative, &self.config.output_root, extension)
            })
            .collect())
    }

    /// Immediate `<prefix>*` subfolders of `root`, then the logs directly in each
    fn discover_log_folders(&self, root: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
        let mut folders: Vec<PathBuf> = fs::read_dir(root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        folders.sort();

        if folders.is_empty() {
            log::error!("No {}* folders found in {:?}", prefix, root);
            return Ok(Vec::new());
        }
        log::info!("Found {} {}* folders", folders.len(), prefix);

        let mut sources = Vec::new();
        for folder in folders {
            let mut files: Vec<PathBuf> = fs::read_dir(&folder)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && self.is_input(path))
                .collect();
            files.sort();

            if files.is_empty() {
                log::warn!("No .{} files found in {:?}", self.config.input_extension, folder);
                continue;
            }
            log::info!("Queued folder {:?} ({} files)", folder, files.len());
            sources.extend(files);
        }

        Ok(sources)
    }

    /// Every log file anywhere below `root`, skipping the output tree
    fn discover_recursive(&self, root: &Path) -> Vec<PathBuf> {
        let output_root = fs::canonicalize(&self.config.output_root).ok();

        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && output_root.is_some()
                    && fs::canonicalize(entry.path()).ok() == output_root)
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.is_input(entry.path()))
            .map(|entry| entry.into_path())
            .collect()
    }

    fn is_input(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.config.is_input_extension(ext))
    }

    /// Process the given jobs and join every outcome before reporting
    ///
    /// Jobs whose outputs would overwrite another job's outputs are not run;
    /// each of them is reported as a failure naming the other input.
    pub fn run_jobs(&self, jobs: &[FileJob]) -> Result<BatchResult> {
        let processor = FileProcessor::new(self.catalog, &self.config.pipeline);
        let collisions = output_collisions(jobs);

        let outcome = |index: usize, job: &FileJob| match collisions.get(&index) {
            Some(other) => Err(format!("output paths collide with input {:?}", other)),
            None => process_isolated(&processor, job),
        };

        let outcomes: Vec<(&FileJob, std::result::Result<FileStats, String>)> =
            if self.config.workers == 0 {
                jobs.iter()
                    .enumerate()
                    .map(|(index, job)| (job, outcome(index, job)))
                    .collect()
            } else {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.workers)
                    .build()?;
                log::debug!("Dispatching {} jobs on {} workers", jobs.len(), self.config.workers);
                pool.install(|| {
                    jobs.par_iter()
                        .enumerate()
                        .map(|(index, job)| (job, outcome(index, job)))
                        .collect()
                })
            };

        let mut result = BatchResult::default();
        for (job, outcome) in outcomes {
            match outcome {
                Ok(stats) => {
                    result.files_processed += 1;
                    result.files.push(FileReport {
                        source: job.source.clone(),
                        relative: job.relative.clone(),
                        stats,
                    });
                }
                Err(error) => {
                    log::error!("Error processing {:?}: {}", job.source, error);
                    result.failures.push(FailedFile {
                        source: job.source.clone(),
                        error,
                    });
                }
            }
        }

        log::info!(
            "Batch processing completed. {} files processed, {} failed.",
            result.files_processed,
            result.files_failed()
        );
        log::info!("Output written to: {:?}", self.config.output_root);

        Ok(result)
    }
}

/// Run one job, turning both errors and panics into a failure message
fn process_isolated<C: MessageCatalog>(
    processor: &FileProcessor<'_, C>,
    job: &FileJob,
) -> std::result::Result<FileStats, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| processor.process(job))) {
        Ok(Ok(stats)) => Ok(stats),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(format!("panicked: {}", message))
        }
    }
}

/// Jobs that share a parsed or skip output path with another job
///
/// Maps the index of every such job to the source of one job it clashes
/// with. Paths are compared exactly as built.
fn output_collisions(jobs: &[FileJob]) -> HashMap<usize, PathBuf> {
    let mut owners: HashMap<&Path, usize> = HashMap::new();
    let mut collisions = HashMap::new();

    for (index, job) in jobs.iter().enumerate() {
        for output in [&job.parsed_output, &job.skip_output] {
            match owners.entry(output.as_path()) {
                Entry::Vacant(slot) => {
                    slot.insert(index);
                }
                Entry::Occupied(slot) => {
                    let other = *slot.get();
                    if other == index {
                        continue;
                    }
                    log::warn!(
                        "{:?} and {:?} would both write {:?}",
                        jobs[other].source,
                        job.source,
                        output
                    );
                    collisions
                        .entry(index)
                        .or_insert_with(|| jobs[other].source.clone());
                    collisions
                        .entry(other)
                        .or_insert_with(|| job.source.clone());
                }
            }
        }
    }

    collisions
}

/// Path of `source` relative to `root`; a file root maps to its file name
fn relative_path(root: &Path, source: &Path) -> PathBuf {
    if root == source {
        return source
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| source.to_path_buf());
    }
    source
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| source.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/data"), Path::new("/data/A/B/c.txt")),
            PathBuf::from("A/B/c.txt")
        );
        assert_eq!(
            relative_path(Path::new("/data/run.txt"), Path::new("/data/run.txt")),
            PathBuf::from("run.txt")
        );
    }

    #[test]
    fn test_output_collisions() {
        let out = Path::new("/out");
        let jobs = vec![
            FileJob::new("/in/A/c.skipped.txt", "A/c.skipped.txt", out, "csv"),
            FileJob::new("/in/A/c.txt", "A/c.txt", out, "csv"),
            FileJob::new("/in/A/d.TXT", "A/d.TXT", out, "csv"),
            FileJob::new("/in/A/d.txt", "A/d.txt", out, "csv"),
            FileJob::new("/in/A/e.txt", "A/e.txt", out, "csv"),
        ];

        let collisions = output_collisions(&jobs);
        assert_eq!(collisions.len(), 4);
        assert_eq!(collisions[&0], PathBuf::from("/in/A/c.txt"));
        assert_eq!(collisions[&1], PathBuf::from("/in/A/c.skipped.txt"));
        assert_eq!(collisions[&2], PathBuf::from("/in/A/d.txt"));
        assert_eq!(collisions[&3], PathBuf::from("/in/A/d.TXT"));
        assert!(!collisions.contains_key(&4));
    }

    #[test]
    fn test_batch_result_totals() {
        let mut stats = FileStats::default();
        stats.skipped_lines = 2;
        stats.records = 5;

        let result = BatchResult {
            files_processed: 2,
            files: vec![
                FileReport {
                    source: PathBuf::from("a.txt"),
                    relative: PathBuf::from("a.txt"),
                    stats: stats.clone(),
                },
                FileReport {
                    source: PathBuf::from("b.txt"),
                    relative: PathBuf::from("b.txt"),
                    stats,
                },
            ],
            failures: vec![FailedFile {
                source: PathBuf::from("c.txt"),
                error: "boom".to_string(),
            }],
        };

        assert_eq!(result.files_failed(), 1);
        assert_eq!(result.skipped_lines(), 4);
        assert_eq!(result.records(), 10);
    }
}
