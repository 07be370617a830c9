//! JSON file storage at a fixed path.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{decode_sessions, encode_sessions, SessionStorage, StorageError, STORAGE_KEY};
use crate::models::Session;

/// Stores the session collection as `<dir>/chatline-sessions.json`.
///
/// Saves write a sibling temporary file, fsync it and rename it over the
/// previous payload, so a crash mid-write leaves the old collection intact.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Storage rooted in the given data directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{STORAGE_KEY}.json")),
        }
    }

    /// Path of the payload file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl SessionStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<Session>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let payload = fs::read_to_string(&self.path)?;
        decode_sessions(&payload)
    }

    fn save(&self, sessions: &[Session]) -> Result<(), StorageError> {
        let payload = encode_sessions(sessions)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.tmp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(payload.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), count = sessions.len(), "Saved sessions");
        Ok(())
    }
}
