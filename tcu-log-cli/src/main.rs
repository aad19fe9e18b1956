//! TCU Log Parser CLI Application
//!
//! Command-line front end for the tcu-log-decoder library:
//! - Loads the DBC message catalog (fatal on failure)
//! - Discovers logs under a root folder (`LOGS*` folders or the whole tree)
//! - Decodes every file into a mirrored output tree
//! - Reports per-file failures through the log, not the exit code

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tcu_log_decoder::{BatchConfig, BatchOrchestrator, Discovery, SignalDatabase};

mod config;
mod report;

/// TCU Log Parser - Decode text CAN logs into per-signal records
#[derive(Parser, Debug)]
#[command(name = "tcu-log")]
#[command(about = "Decode TCU text CAN logs using DBC signal definitions", long_about = None)]
#[command(version)]
struct Args {
    /// Root folder containing LOGS folders (or a single log file)
    #[arg(value_name = "PATH")]
    root: PathBuf,

    /// Path to DBC file(s) (can be repeated)
    #[arg(long, value_name = "FILE")]
    dbc: Vec<PathBuf>,

    /// Output folder for parsed and skipped files
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Process every log file under the root recursively
    #[arg(short, long)]
    all: bool,

    /// Name prefix of log folders scanned when not recursive
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,

    /// Number of worker threads (0 = sequential)
    #[arg(short, long, value_name = "COUNT")]
    jobs: Option<usize>,

    /// Skip this frame ID regardless of the catalog (decimal or 0x hex, can be repeated)
    #[arg(long, value_name = "ID", value_parser = config::parse_frame_id)]
    ignore_frame_id: Vec<u32>,

    /// Write unquoted fields exactly like older tooling did
    #[arg(long)]
    legacy_format: bool,

    /// Write a JSON summary of the run to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("TCU Log Parser v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using decoder library v{}", tcu_log_decoder::VERSION);

    let file_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::AppConfig::default(),
    };

    let mut dbc_files = file_config.input.dbc_files.clone();
    dbc_files.extend(args.dbc.iter().cloned());
    if dbc_files.is_empty() {
        bail!("No DBC file given (use --dbc or [input] dbc_files in the config file)");
    }

    let batch_config = apply_overrides(&args, file_config.batch_config());
    let report_path = args.report.clone().or(file_config.output.report.clone());

    // The catalog must be complete before any file is opened
    let catalog =
        SignalDatabase::from_dbc_files(&dbc_files).context("Failed to load message catalog")?;
    let stats = catalog.stats();
    log::info!(
        "Signal database: {} messages, {} signals",
        stats.num_messages,
        stats.num_signals
    );

    let orchestrator = BatchOrchestrator::new(&catalog, batch_config);
    let result = orchestrator
        .run(&args.root)
        .with_context(|| format!("Batch over {:?} failed", args.root))?;

    report::log_summary(&result);
    if let Some(path) = report_path {
        report::write_report(&path, &result)?;
    }

    Ok(())
}

/// Apply command-line flags on top of the file configuration
fn apply_overrides(args: &Args, mut config: BatchConfig) -> BatchConfig {
    if let Some(ref dir) = args.output_dir {
        config.output_root = dir.clone();
    }
    if args.all {
        config.discovery = Discovery::Recursive;
    } else if let Some(ref prefix) = args.prefix {
        config.discovery = Discovery::LogFolders {
            prefix: prefix.clone(),
        };
    }
    if let Some(jobs) = args.jobs {
        config.workers = jobs;
    }
    for &frame_id in &args.ignore_frame_id {
        config.pipeline = config.pipeline.ignore_frame_id(frame_id);
    }
    if args.legacy_format {
        config.pipeline.quote_fields = false;
    }
    config
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcu_log_decoder::LEGACY_IGNORED_FRAME_ID;

    #[test]
    fn test_flags_override_file_config() {
        let args = Args::try_parse_from([
            "tcu-log",
            "logs",
            "--dbc",
            "2024CAR.dbc",
            "-a",
            "-j",
            "8",
            "-o",
            "out",
            "--ignore-frame-id",
            "0x0D000001",
            "--legacy-format",
        ])
        .unwrap();

        let config = apply_overrides(&args, BatchConfig::new().with_workers(2));
        assert_eq!(config.discovery, Discovery::Recursive);
        assert_eq!(config.workers, 8);
        assert_eq!(config.output_root, PathBuf::from("out"));
        assert!(config.pipeline.is_ignored(LEGACY_IGNORED_FRAME_ID));
        assert!(!config.pipeline.quote_fields);
    }

    #[test]
    fn test_defaults_without_flags() {
        let args = Args::try_parse_from(["tcu-log", "logs"]).unwrap();
        let config = apply_overrides(&args, BatchConfig::new());
        assert_eq!(config, BatchConfig::new());
    }

    #[test]
    fn test_rejects_bad_frame_id() {
        let result = Args::try_parse_from(["tcu-log", "logs", "--ignore-frame-id", "nope"]);
        assert!(result.is_err());
    }
}
