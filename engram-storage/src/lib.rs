//! # engram-storage
//!
//! SQLite persistence layer for the Engram memory system.
//! Implements the `EntityStore`, `MemoryStore`, and `EventLog` traits.
//! Single write connection + read pool (WAL mode on disk).

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;
pub mod similarity;
pub mod vector;

pub use engine::StorageEngine;

/// Helper to convert a string message into an `EngramError::Storage`.
pub fn to_storage_err(msg: String) -> engram_core::EngramError {
    engram_core::EngramError::Storage(engram_core::errors::StorageError::Sqlite {
        message: msg,
    })
}
