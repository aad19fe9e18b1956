//! Unified signal database
//!
//! Combines message definitions from one or more DBC files into a single
//! read-only lookup table keyed by CAN ID.

use crate::types::{DecoderError, Result};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;

/// A complete CAN message definition
#[derive(Debug, Clone)]
pub struct MessageDefinition {
    /// CAN message ID (extended flag cleared)
    pub id: u32,
    /// Message name
    pub name: String,
    /// Message size in bytes
    pub size: usize,
    /// All signals in this message, in definition order
    pub signals: Vec<SignalDefinition>,
    /// True if this message has multiplexed signals
    pub is_multiplexed: bool,
    /// Multiplexer signal name (if multiplexed)
    pub multiplexer_signal: Option<String>,
    /// Source file (DBC filename)
    pub source: String,
}

/// A CAN signal definition
#[derive(Debug, Clone)]
pub struct SignalDefinition {
    /// Signal name
    pub name: String,
    /// Start bit in the CAN frame
    pub start_bit: u16,
    /// Length in bits
    pub length: u16,
    pub byte_order: ByteOrder,
    pub value_type: ValueType,
    /// Scale factor to convert raw value to physical value
    pub factor: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// Value table for enum-like values (raw_value -> description)
    pub value_table: Option<HashMap<i64, String>>,
    /// Multiplexer info (None if not multiplexed)
    pub multiplexer_info: Option<MultiplexerInfo>,
}

/// Byte order for signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian (Intel format)
    LittleEndian,
    /// Big-endian (Motorola format)
    BigEndian,
}

/// Value type for signal interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Signed,
    Unsigned,
}

/// Multiplexer information for multiplexed signals
#[derive(Debug, Clone)]
pub struct MultiplexerInfo {
    /// Name of the multiplexer signal that controls this signal
    pub multiplexer_signal: String,
    /// Multiplexer value(s) for which this signal is active
    pub multiplexer_values: Vec<u64>,
}

/// The unified signal database
///
/// Built once before a batch starts and shared read-only by every worker.
pub struct SignalDatabase {
    /// Key: CAN ID (first loaded definition wins)
    messages: HashMap<u32, MessageDefinition>,
}

impl SignalDatabase {
    /// Create a new empty signal database
    pub fn new() -> Self {
        Self {
            messages: HashMap::new(),
        }
    }

    /// Load every DBC file into a fresh database
    ///
    /// Any unreadable or malformed file fails the whole load: a batch must
    /// not start with a partial catalog.
    pub fn from_dbc_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        if paths.is_empty() {
            return Err(DecoderError::CatalogLoadFailure(
                "no DBC files given".to_string(),
            ));
        }

        let mut db = Self::new();
        for path in paths {
            db.add_dbc(path.as_ref())?;
        }
        Ok(db)
    }

    /// Parse a DBC file and add its messages to the database
    pub fn add_dbc(&mut self, path: &Path) -> Result<()> {
        let messages = crate::signals::dbc::parse_dbc_file(path)
            .map_err(|e| DecoderError::CatalogLoadFailure(e.to_string()))?;

        for message in messages {
            self.add_message(message);
        }

        log::info!("DBC file loaded successfully: {:?}", path);
        Ok(())
    }

    /// Add a message definition to the database
    ///
    /// A definition for an ID that is already known is dropped with a warning.
    pub fn add_message(&mut self, message: MessageDefinition) {
        match self.messages.entry(message.id) {
            Entry::Vacant(slot) => {
                slot.insert(message);
            }
            Entry::Occupied(slot) => {
                let kept = slot.get();
                log::warn!(
                    "Duplicate definition for CAN ID 0x{:X}: keeping {} from {}, dropping {} from {}",
                    message.id,
                    kept.name,
                    kept.source,
                    message.name,
                    message.source
                );
            }
        }
    }

    /// Get the message definition for a CAN ID
    pub fn get_message(&self, can_id: u32) -> Option<&MessageDefinition> {
        self.messages.get(&can_id)
    }

    /// Get database statistics
    pub fn stats(&self) -> DatabaseStats {
        let num_messages = self.messages.len();
        let num_signals: usize = self.messages.values().map(|msg| msg.signals.len()).sum();

        DatabaseStats {
            num_messages,
            num_signals,
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Total number of message definitions
    pub num_messages: usize,
    /// Total number of signal definitions
    pub num_signals: usize,
}

impl Default for SignalDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_message(id: u32, source: &str) -> MessageDefinition {
        MessageDefinition {
            id,
            name: "EngineData".to_string(),
            size: 8,
            signals: vec![SignalDefinition {
                name: "EngineSpeed".to_string(),
                start_bit: 0,
                length: 16,
                byte_order: ByteOrder::LittleEndian,
                value_type: ValueType::Unsigned,
                factor: 1.0,
                offset: 0.0,
                value_table: None,
                multiplexer_info: None,
            }],
            is_multiplexed: false,
            multiplexer_signal: None,
            source: source.to_string(),
        }
    }

    #[test]
    fn test_empty_database() {
        let db = SignalDatabase::new();
        let stats = db.stats();
        assert_eq!(stats.num_messages, 0);
        assert_eq!(stats.num_signals, 0);
        assert!(db.get_message(0x123).is_none());
    }

    #[test]
    fn test_add_message() {
        let mut db = SignalDatabase::new();
        db.add_message(engine_message(0x123, "a.dbc"));

        let stats = db.stats();
        assert_eq!(stats.num_messages, 1);
        assert_eq!(stats.num_signals, 1);

        let msg = db.get_message(0x123).unwrap();
        assert_eq!(msg.name, "EngineData");
        assert_eq!(msg.signals[0].name, "EngineSpeed");
    }

    #[test]
    fn test_first_loaded_definition_wins() {
        let mut db = SignalDatabase::new();
        db.add_message(engine_message(0x123, "first.dbc"));
        db.add_message(engine_message(0x123, "second.dbc"));

        assert_eq!(db.stats().num_messages, 1);
        assert_eq!(db.get_message(0x123).unwrap().source, "first.dbc");
    }

    #[test]
    fn test_load_requires_files() {
        let paths: Vec<&Path> = Vec::new();
        let result = SignalDatabase::from_dbc_files(&paths);
        assert!(matches!(result, Err(DecoderError::CatalogLoadFailure(_))));
    }

    #[test]
    fn test_missing_dbc_is_catalog_failure() {
        let result = SignalDatabase::from_dbc_files(&[Path::new("does-not-exist.dbc")]);
        assert!(matches!(result, Err(DecoderError::CatalogLoadFailure(_))));
    }
}
