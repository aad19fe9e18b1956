//! Message catalog interface
//!
//! Narrow seam between the decode pipeline and whatever owns the bit-level
//! layout of each message.

use crate::message_decoder::MessageDecoder;
use crate::signals::database::{MessageDefinition, SignalDatabase};
use crate::types::{Result, SignalValue};

/// Read-only lookup and decode of CAN messages
///
/// A catalog is built once and then shared by reference across all file
/// jobs, so implementations must be `Sync` and must not mutate themselves
/// while decoding.
pub trait MessageCatalog: Sync {
    /// Catalog-specific message definition
    type Message;

    /// Resolve a frame identifier to its message definition
    fn lookup(&self, frame_id: u32) -> Option<&Self::Message>;

    /// Decode payload bytes into `(signal name, value)` pairs
    ///
    /// The returned order is the catalog's own and is preserved by callers.
    fn decode(&self, message: &Self::Message, payload: &[u8]) -> Result<Vec<(String, SignalValue)>>;
}

impl MessageCatalog for SignalDatabase {
    type Message = MessageDefinition;

    fn lookup(&self, frame_id: u32) -> Option<&MessageDefinition> {
        self.get_message(frame_id)
    }

    fn decode(
        &self,
        message: &MessageDefinition,
        payload: &[u8],
    ) -> Result<Vec<(String, SignalValue)>> {
        MessageDecoder::decode_message(message, payload)
    }
}
