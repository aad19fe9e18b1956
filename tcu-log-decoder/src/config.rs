//! Decoder configuration types
//!
//! This module defines the configuration consumed by the pipeline (how a
//! single file is decoded and written) and by the batch driver (which files
//! are discovered and how they are dispatched).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Frame identifier that older tooling dropped unconditionally.
///
/// Not applied unless added to [`PipelineConfig::ignored_frame_ids`].
pub const LEGACY_IGNORED_FRAME_ID: u32 = 218_103_553;

/// Configuration for decoding and writing a single log file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Frame identifiers routed to the skip stream before catalog lookup
    #[serde(default)]
    pub ignored_frame_ids: Vec<u32>,

    /// Quote output fields that contain separators (false = legacy format)
    #[serde(default = "default_true")]
    pub quote_fields: bool,

    /// Extension used for both parsed and skip outputs
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
}

fn default_true() -> bool {
    true
}

fn default_output_extension() -> String {
    "csv".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ignored_frame_ids: Vec::new(),
            quote_fields: true,
            output_extension: default_output_extension(),
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: skip a frame identifier regardless of the catalog
    pub fn ignore_frame_id(mut self, frame_id: u32) -> Self {
        if !self.ignored_frame_ids.contains(&frame_id) {
            self.ignored_frame_ids.push(frame_id);
        }
        self
    }

    /// Builder method: enable or disable field quoting
    pub fn with_quoting(mut self, enabled: bool) -> Self {
        self.quote_fields = enabled;
        self
    }

    /// Builder method: set the output extension (without the leading dot)
    pub fn with_output_extension(mut self, extension: impl Into<String>) -> Self {
        self.output_extension = extension.into();
        self
    }

    /// Check if a frame identifier is on the ignore list
    pub fn is_ignored(&self, frame_id: u32) -> bool {
        self.ignored_frame_ids.contains(&frame_id)
    }
}

/// How the batch driver finds its input files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Discovery {
    /// Immediate subfolders of the root whose name starts with `prefix`,
    /// and the log files directly inside each of them
    LogFolders { prefix: String },
    /// Every log file anywhere under the root
    Recursive,
}

impl Default for Discovery {
    fn default() -> Self {
        Discovery::LogFolders {
            prefix: "LOGS".to_string(),
        }
    }
}

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Root of the mirrored output tree
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Input discovery mode
    #[serde(default)]
    pub discovery: Discovery,

    /// Extension of input log files (matched case-insensitively)
    #[serde(default = "default_input_extension")]
    pub input_extension: String,

    /// Worker threads (0 = process files sequentially on the caller's thread)
    #[serde(default)]
    pub workers: usize,

    /// Per-file decode settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_output_root() -> PathBuf {
    PathBuf::from("parsed_files")
}

fn default_input_extension() -> String {
    "txt".to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            discovery: Discovery::default(),
            input_extension: default_input_extension(),
            workers: 0,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Create a new batch configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the output root
    pub fn with_output_root(mut self, output_root: impl Into<PathBuf>) -> Self {
        self.output_root = output_root.into();
        self
    }

    /// Builder method: set the discovery mode
    pub fn with_discovery(mut self, discovery: Discovery) -> Self {
        self.discovery = discovery;
        self
    }

    /// Builder method: set the number of worker threads
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Builder method: set the per-file pipeline configuration
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Check if a file extension marks an input log
    pub fn is_input_extension(&self, extension: &str) -> bool {
        extension.eq_ignore_ascii_case(&self.input_extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_builder() {
        let config = PipelineConfig::new()
            .ignore_frame_id(LEGACY_IGNORED_FRAME_ID)
            .ignore_frame_id(LEGACY_IGNORED_FRAME_ID)
            .with_quoting(false)
            .with_output_extension("txt");

        assert_eq!(config.ignored_frame_ids, vec![218103553]);
        assert!(config.is_ignored(0x0D00_0001));
        assert!(!config.quote_fields);
        assert_eq!(config.output_extension, "txt");
    }

    #[test]
    fn test_no_frames_ignored_by_default() {
        let config = PipelineConfig::new();
        assert!(!config.is_ignored(LEGACY_IGNORED_FRAME_ID));
        assert!(config.quote_fields);
    }

    #[test]
    fn test_batch_config_defaults() {
        let config = BatchConfig::new();
        assert_eq!(config.output_root, PathBuf::from("parsed_files"));
        assert_eq!(
            config.discovery,
            Discovery::LogFolders {
                prefix: "LOGS".to_string()
            }
        );
        assert!(config.is_input_extension("TXT"));
        assert!(!config.is_input_extension("csv"));
        assert_eq!(config.workers, 0);
    }
}
