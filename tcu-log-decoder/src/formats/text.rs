//! Fixed-width text log format
//!
//! ## Layout
//! - `[0, 8)`: timestamp, hex milliseconds
//! - `[8]`: separator (`x`)
//! - `[9, 17)`: frame identifier, hex
//! - `[17, ..)`: payload, hex, two characters per byte (may be empty)
//!
//! Lines are handled as raw bytes so that anything routed to the skip stream
//! can be written back unchanged, whatever its encoding or line ending.

use crate::types::{ParsedFrame, SkipReason};
use std::io::{self, BufRead, Read};

/// Separator between timestamp and frame identifier
pub const SEPARATOR: u8 = b'x';

/// Minimum length of a well-formed line (timestamp + separator + identifier)
pub const HEADER_LEN: usize = 17;

/// Split one log line into timestamp, frame identifier and payload
///
/// Surrounding ASCII whitespace (including the line terminator) is ignored.
/// The payload is returned as-is; validating it is left to the frame decoder.
pub fn tokenize(line: &[u8]) -> Result<ParsedFrame<'_>, SkipReason> {
    let line = line.trim_ascii();

    if line.len() < HEADER_LEN || line[8] != SEPARATOR {
        return Err(SkipReason::Malformed);
    }

    let timestamp_ms = parse_hex_field(&line[..8]).ok_or(SkipReason::Malformed)?;
    let frame_id = parse_hex_field(&line[9..HEADER_LEN]).ok_or(SkipReason::Malformed)?;

    Ok(ParsedFrame {
        timestamp_ms,
        // Eight hex digits always fit
        frame_id: frame_id as u32,
        payload_hex: &line[HEADER_LEN..],
    })
}

/// Parse a header field made only of hex digits (no sign, no prefix)
fn parse_hex_field(field: &[u8]) -> Option<u64> {
    if field.is_empty() || !field.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let text = std::str::from_utf8(field).ok()?;
    u64::from_str_radix(text, 16).ok()
}

/// Longest line read in one piece; real frames are far shorter
pub const MAX_LINE_LEN: usize = 4096;

/// One item read from a log stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    /// A whole line, with its terminator when present
    Complete(Vec<u8>),
    /// A piece of a line longer than [`MAX_LINE_LEN`]; `first` marks where it starts
    Oversized { chunk: Vec<u8>, first: bool },
}

/// Iterator over the raw lines of a log stream
///
/// Each item keeps its original bytes, including the trailing `\n` or
/// `\r\n` when present. The file is never loaded whole: lines longer than
/// [`MAX_LINE_LEN`] come out as consecutive [`LogLine::Oversized`] chunks.
pub struct LogLines<R: BufRead> {
    reader: R,
    in_oversized: bool,
}

impl<R: BufRead> LogLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            in_oversized: false,
        }
    }
}

impl<R: BufRead> Iterator for LogLines<R> {
    type Item = io::Result<LogLine>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = Vec::new();
        let read = self
            .reader
            .by_ref()
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut chunk);

        match read {
            Ok(0) => None,
            Ok(_) => {
                let continues = self.in_oversized;
                self.in_oversized = chunk.len() == MAX_LINE_LEN && chunk.last() != Some(&b'\n');

                if continues {
                    Some(Ok(LogLine::Oversized { chunk, first: false }))
                } else if self.in_oversized {
                    Some(Ok(LogLine::Oversized { chunk, first: true }))
                } else {
                    Some(Ok(LogLine::Complete(chunk)))
                }
            }
            Err(e) => Some(Err(e)),
        }
    }
}
