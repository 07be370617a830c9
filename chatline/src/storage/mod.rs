//! Persistence adapter for the session collection.
//!
//! The whole collection is stored as one JSON array under a single fixed key.
//! Persistence is best-effort: callers log and swallow save failures, and a
//! failed load reads as an empty collection.

mod file;
mod memory;

pub use file::JsonFileStorage;
pub use memory::MemoryStorage;

use thiserror::Error;

use crate::models::Session;

/// Fixed key the session collection is stored under.
pub const STORAGE_KEY: &str = "chatline-sessions";

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying store could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A key-value blob store holding the full session list.
pub trait SessionStorage: Send {
    /// Read every stored session. An absent entry is an empty list.
    fn load(&self) -> Result<Vec<Session>, StorageError>;

    /// Replace the stored collection with `sessions`.
    fn save(&self, sessions: &[Session]) -> Result<(), StorageError>;

    /// Read every stored session, treating any failure as "no sessions".
    fn load_or_empty(&self) -> Vec<Session> {
        match self.load() {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load sessions, starting empty");
                Vec::new()
            }
        }
    }
}

/// Encode the session collection into the stored JSON payload.
pub fn encode_sessions(sessions: &[Session]) -> Result<String, StorageError> {
    Ok(serde_json::to_string(sessions)?)
}

/// Decode the stored JSON payload. Blank payloads are an empty list.
pub fn decode_sessions(payload: &str) -> Result<Vec<Session>, StorageError> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(payload)?)
}
