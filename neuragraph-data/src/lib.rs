//! # neuragraph-data
//!
//! File-backed collaborators of `neuragraph-core`: a CSV reader node that
//! feeds a network one record line per forward pass, and a versioned JSON
//! schema for saving and restoring the blocks of a network.

pub mod csv_reader;
pub mod persist;

pub use csv_reader::CsvReader;
pub use persist::{load, restore, save, snapshot, BlockRecord, NetworkSnapshot, NodeRecord, PersistError};
