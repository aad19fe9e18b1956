//! Frame decoder
//!
//! Turns one raw log line into either the decoded signals of its frame or the
//! reason it cannot be decoded. Stages run in order and stop at the first
//! failure:
//! 1. Tokenize the line → `Malformed`
//! 2. Apply the configured ignore list → `IgnoredFrame`
//! 3. Resolve the frame identifier in the catalog → `UnknownFrame`
//! 4. Convert the hex payload to bytes → `DecodeError`
//! 5. Decode the payload with the catalog → `DecodeError`

use crate::config::PipelineConfig;
use crate::formats::tokenize;
use crate::signals::MessageCatalog;
use crate::types::{DecodedSignal, SkipReason};

/// Decodes log lines against a shared, read-only catalog
pub struct FrameDecoder<'a, C: MessageCatalog> {
    catalog: &'a C,
    config: &'a PipelineConfig,
}

impl<'a, C: MessageCatalog> FrameDecoder<'a, C> {
    /// Create a decoder borrowing the catalog and pipeline settings
    pub fn new(catalog: &'a C, config: &'a PipelineConfig) -> Self {
        Self { catalog, config }
    }

    /// Decode one raw line
    ///
    /// On success the signals are returned in the order the catalog decoded
    /// them, all stamped with the frame's timestamp in seconds. Catalog errors
    /// never escape: they are reported as [`SkipReason::DecodeError`].
    pub fn decode_line(&self, line: &[u8]) -> Result<Vec<DecodedSignal>, SkipReason> {
        let frame = tokenize(line)?;

        if self.config.is_ignored(frame.frame_id) {
            log::trace!("Ignoring frame 0x{:X} by configuration", frame.frame_id);
            return Err(SkipReason::IgnoredFrame);
        }

        let message = self.catalog.lookup(frame.frame_id).ok_or_else(|| {
            log::trace!("Unknown frame ID: 0x{:X}", frame.frame_id);
            SkipReason::UnknownFrame
        })?;

        let payload = hex::decode(frame.payload_hex).map_err(|e| {
            log::debug!("Bad payload for frame 0x{:X}: {}", frame.frame_id, e);
            SkipReason::DecodeError
        })?;

        let values = self.catalog.decode(message, &payload).map_err(|e| {
            log::debug!("Failed to decode frame 0x{:X}: {}", frame.frame_id, e);
            SkipReason::DecodeError
        })?;

        let timestamp = frame.timestamp();
        Ok(values
            .into_iter()
            .map(|(name, value)| DecodedSignal {
                timestamp,
                name,
                value,
            })
            .collect())
    }
}
