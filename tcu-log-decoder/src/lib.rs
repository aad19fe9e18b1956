//! TCU Log Decoder Library
//!
//! Decodes fixed-width text CAN logs written by the vehicle TCU into
//! per-signal records, using message definitions loaded from DBC files.
//!
//! # Architecture
//!
//! Data flows strictly downward:
//! - [`BatchOrchestrator`] discovers input files and mirrors their paths
//!   under the output root
//! - [`FileProcessor`] streams one file, splitting lines into a parsed
//!   output and a skip output
//! - [`FrameDecoder`] turns one line into signals or a [`SkipReason`]
//! - [`tokenize`] and the [`MessageCatalog`] do the actual parsing and
//!   bit-level decoding
//!
//! The catalog is loaded once, never mutated, and shared by reference with
//! every worker.
//!
//! # Example Usage
//!
//! ```no_run
//! use tcu_log_decoder::{BatchConfig, BatchOrchestrator, Discovery, SignalDatabase};
//! use std::path::Path;
//!
//! let catalog = SignalDatabase::from_dbc_files(&[Path::new("2024CAR.dbc")]).unwrap();
//!
//! let config = BatchConfig::new()
//!     .with_output_root("parsed_files")
//!     .with_discovery(Discovery::Recursive)
//!     .with_workers(4);
//!
//! let result = BatchOrchestrator::new(&catalog, config)
//!     .run(Path::new("logs"))
//!     .unwrap();
//! println!("{} files processed", result.files_processed);
//! ```

// Public modules
pub mod batch;
pub mod config;
pub mod decoder;
pub mod processor;
pub mod types;

// Re-export main types for convenience
pub use batch::{BatchOrchestrator, BatchResult, FailedFile, FileReport};
pub use config::{BatchConfig, Discovery, PipelineConfig, LEGACY_IGNORED_FRAME_ID};
pub use decoder::FrameDecoder;
pub use formats::{tokenize, LogLine, LogLines, MAX_LINE_LEN};
pub use processor::{FileJob, FileProcessor, FileStats};
pub use signals::{DatabaseStats, MessageCatalog, MessageDefinition, SignalDatabase};
pub use types::{DecodedSignal, DecoderError, ParsedFrame, Result, SignalValue, SkipReason};

// Internal modules (not exposed in public API)
mod formats;
mod message_decoder;
mod signals;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        let db = SignalDatabase::new();
        let stats = db.stats();
        assert_eq!(stats.num_messages, 0);
        assert!(db.lookup(0x123).is_none());
    }
}
