//! Configuration file loading and parsing
//!
//! Every setting is optional in the file; command-line flags are applied on
//! top of the resulting [`BatchConfig`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tcu_log_decoder::{BatchConfig, Discovery, PipelineConfig};

/// Application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
    #[serde(default)]
    pub batch: BatchSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default)]
    pub dbc_files: Vec<PathBuf>,
    /// Scan the whole tree instead of `<prefix>*` folders
    #[serde(default)]
    pub recursive: bool,
    pub folder_prefix: Option<String>,
    pub extension: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    pub dir: Option<PathBuf>,
    pub extension: Option<String>,
    pub quote_fields: Option<bool>,
    /// Where to write the JSON run report
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DecodeConfig {
    #[serde(default)]
    pub ignored_frame_ids: Vec<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BatchSection {
    pub workers: Option<usize>,
}

impl AppConfig {
    /// Batch configuration described by this file, defaults elsewhere
    pub fn batch_config(&self) -> BatchConfig {
        let mut pipeline = PipelineConfig::new();
        for &frame_id in &self.decode.ignored_frame_ids {
            pipeline = pipeline.ignore_frame_id(frame_id);
        }
        if let Some(quote) = self.output.quote_fields {
            pipeline = pipeline.with_quoting(quote);
        }
        if let Some(ref extension) = self.output.extension {
            pipeline = pipeline.with_output_extension(extension.clone());
        }

        let mut config = BatchConfig::new().with_pipeline(pipeline);
        if let Some(ref dir) = self.output.dir {
            config = config.with_output_root(dir.clone());
        }
        if self.input.recursive {
            config = config.with_discovery(Discovery::Recursive);
        } else if let Some(ref prefix) = self.input.folder_prefix {
            config = config.with_discovery(Discovery::LogFolders {
                prefix: prefix.clone(),
            });
        }
        if let Some(ref extension) = self.input.extension {
            config.input_extension = extension.clone();
        }
        if let Some(workers) = self.batch.workers {
            config = config.with_workers(workers);
        }
        config
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

/// Parse a frame identifier given as decimal or `0x`-prefixed hex
pub fn parse_frame_id(value: &str) -> std::result::Result<u32, String> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid frame ID '{}': {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcu_log_decoder::LEGACY_IGNORED_FRAME_ID;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [input]
            dbc_files = ["2024CAR.dbc"]
            folder_prefix = "RUN"

            [output]
            dir = "out"
            quote_fields = false

            [decode]
            ignored_frame_ids = [0x0D000001]

            [batch]
            workers = 4
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.input.dbc_files.len(), 1);

        let batch = config.batch_config();
        assert_eq!(batch.output_root, PathBuf::from("out"));
        assert_eq!(
            batch.discovery,
            Discovery::LogFolders {
                prefix: "RUN".to_string()
            }
        );
        assert_eq!(batch.workers, 4);
        assert!(!batch.pipeline.quote_fields);
        assert!(batch.pipeline.is_ignored(LEGACY_IGNORED_FRAME_ID));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.batch_config(), BatchConfig::new());
    }

    #[test]
    fn test_parse_frame_id() {
        assert_eq!(parse_frame_id("218103553"), Ok(LEGACY_IGNORED_FRAME_ID));
        assert_eq!(parse_frame_id("0x0D000001"), Ok(LEGACY_IGNORED_FRAME_ID));
        assert_eq!(parse_frame_id("0XC8"), Ok(200));
        assert!(parse_frame_id("0xZZ").is_err());
        assert!(parse_frame_id("-1").is_err());
    }
}
