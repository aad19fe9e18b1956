//! Core types for the TCU log decoder library
//!
//! This module defines the values that flow through the decode pipeline: the
//! tokenized frame, the decoded signal records, the per-line skip
//! classification and the error type shared by every fallible operation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// A syntactically valid log line, split into its three fields
///
/// The payload is still hex text at this stage; it is converted to bytes by
/// the frame decoder once the frame identifier has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFrame<'a> {
    /// Capture time in milliseconds, as written in the log
    pub timestamp_ms: u64,
    /// CAN frame identifier (11-bit or 29-bit)
    pub frame_id: u32,
    /// Payload as hex characters (two per byte), not yet validated
    pub payload_hex: &'a [u8],
}

impl ParsedFrame<'_> {
    /// Timestamp in seconds
    pub fn timestamp(&self) -> f64 {
        self.timestamp_ms as f64 / 1000.0
    }
}

/// Why a line was routed to the skip stream
///
/// Every skipped line carries exactly one reason; the first failing stage
/// of the pipeline wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Line failed structural validation (length, separator, hex header)
    Malformed,
    /// Frame identifier is not defined in the catalog
    UnknownFrame,
    /// Payload could not be decoded for the resolved message
    DecodeError,
    /// Frame identifier is on the configured ignore list
    IgnoredFrame,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Malformed => "malformed",
            SkipReason::UnknownFrame => "unknown_frame",
            SkipReason::DecodeError => "decode_error",
            SkipReason::IgnoredFrame => "ignored_frame",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while loading a catalog or processing files
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Failed to parse DBC file: {0}")]
    DbcParseError(String),

    #[error("Failed to load message catalog: {0}")]
    CatalogLoadFailure(String),

    #[error("Invalid signal definition: {0}")]
    InvalidSignalDefinition(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Payload for message '{message}' has {actual} bytes, expected {expected}")]
    PayloadLength {
        message: String,
        expected: usize,
        actual: usize,
    },

    #[error("Input path not found: {0:?}")]
    InputNotFound(PathBuf),

    #[error("No input files found under {0:?}")]
    NoInputs(PathBuf),

    #[error("Failed to process {path:?}: {source}")]
    FileFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DecoderError {
    /// Wrap an I/O error with the identity of the file being processed
    pub fn file_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DecoderError::FileFailure {
            path: path.into(),
            source,
        }
    }
}

/// One physical signal value at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSignal {
    /// Frame timestamp in seconds
    pub timestamp: f64,
    /// Signal name from the catalog
    pub name: String,
    /// Decoded physical (or symbolic) value
    pub value: SignalValue,
}

/// Signal value types produced by the catalog
#[derive(Debug, Clone, PartialEq)]
pub enum SignalValue {
    /// Unscaled integer value
    Integer(i64),
    /// Floating-point value (after scaling/offset)
    Float(f64),
    /// Named state from the signal's value table
    Symbolic(String),
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Integer(v) => write!(f, "{}", v),
            SignalValue::Float(v) => f.write_str(&format_float(*v)),
            SignalValue::Symbolic(v) => f.write_str(v),
        }
    }
}

/// Render a float so it always carries a fractional part
///
/// `1.0` must never print as `1`: readers of the parsed output treat a
/// timestamp without a decimal point as hex milliseconds.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_value_display() {
        assert_eq!(format!("{}", SignalValue::Integer(4680)), "4680");
        assert_eq!(format!("{}", SignalValue::Float(12.5)), "12.5");
        assert_eq!(format!("{}", SignalValue::Float(3.0)), "3.0");
        assert_eq!(format!("{}", SignalValue::Float(-0.25)), "-0.25");
        assert_eq!(format!("{}", SignalValue::Symbolic("Drive".into())), "Drive");
    }

    #[test]
    fn test_frame_timestamp_in_seconds() {
        let frame = ParsedFrame {
            timestamp_ms: 0x1F4,
            frame_id: 0xC8,
            payload_hex: b"112233",
        };
        assert_eq!(frame.timestamp(), 0.5);
        assert_eq!(format_float(frame.timestamp()), "0.5");
    }

    #[test]
    fn test_skip_reason_labels() {
        assert_eq!(SkipReason::UnknownFrame.to_string(), "unknown_frame");
        assert_eq!(SkipReason::Malformed.as_str(), "malformed");
    }
}
