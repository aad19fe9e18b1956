//! Signal database, DBC parser and the catalog interface
//!
//! The decode pipeline only sees the [`MessageCatalog`] trait; the
//! DBC-backed [`SignalDatabase`] is one implementation of it.

pub mod catalog;
pub mod database;
pub mod dbc;

// Re-export key types for convenience
pub use catalog::MessageCatalog;
pub use database::{DatabaseStats, MessageDefinition, SignalDatabase};
