//! Log file format readers
//!
//! Only the fixed-width text format written by the TCU logger is supported:
//! one frame per line, `TTTTTTTTxIIIIIIIIDD..DD`.

pub mod text;

pub use text::{tokenize, LogLine, LogLines, MAX_LINE_LEN};
