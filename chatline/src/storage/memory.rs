//! In-process storage, used for ephemeral runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{decode_sessions, encode_sessions, SessionStorage, StorageError};
use crate::models::Session;

/// Keeps the encoded payload in memory.
///
/// Clones share the same blob, so a test can keep a handle and inspect what
/// the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blob: Arc<Mutex<Option<String>>>,
    fail_saves: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with a raw payload.
    #[cfg(test)]
    pub fn with_payload(payload: &str) -> Self {
        let storage = Self::default();
        *storage.lock() = Some(payload.to_string());
        storage
    }

    /// Make every subsequent save fail (or succeed again).
    #[cfg(test)]
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// The raw payload as last written.
    #[cfg(test)]
    pub fn payload(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.blob.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<Session>, StorageError> {
        self.lock()
            .as_deref()
            .map_or_else(|| Ok(Vec::new()), decode_sessions)
    }

    fn save(&self, sessions: &[Session]) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other(
                "storage quota exceeded",
            )));
        }
        let payload = encode_sessions(sessions)?;
        *self.lock() = Some(payload);
        Ok(())
    }
}
