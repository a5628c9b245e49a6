//! Durable storage for the message history.
//!
//! A single JSON array of messages under a well-known path. Every read and
//! write validates the schema; corrupt data is wiped rather than repaired.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use finchat_core::Message;

use crate::error::ClientError;

/// File-backed store for the conversation history.
pub struct MessageStore {
    path: PathBuf,
}

impl MessageStore {
    /// Create a store over the given file path. No I/O happens here.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Validate and persist the full history.
    ///
    /// A validation failure returns the error and leaves the previously
    /// stored state untouched. The write goes through a temp file and a
    /// rename, so a crash mid-write cannot leave a partial file behind.
    pub fn save(&self, history: &[Message]) -> Result<(), ClientError> {
        for message in history {
            message.validate()?;
        }
        let json = serde_json::to_string(history)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(count = history.len(), "history saved");
        Ok(())
    }

    /// Load the stored history.
    ///
    /// A missing file yields an empty history. Corrupt or invalid data
    /// wipes the store and yields an empty history. Entries still marked
    /// pending belong to a session that never confirmed delivery; they are
    /// dropped rather than re-queued.
    pub fn load(&self) -> Vec<Message> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read stored history, starting empty");
                self.clear();
                return Vec::new();
            }
        };

        let parsed: Vec<Message> = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "stored history is corrupt, wiping");
                self.clear();
                return Vec::new();
            }
        };

        if let Some(e) = parsed.iter().find_map(|m| m.validate().err()) {
            warn!(error = %e, "stored history failed validation, wiping");
            self.clear();
            return Vec::new();
        }

        parsed.into_iter().filter(|m| !m.pending).collect()
    }

    /// Erase the stored history. Idempotent.
    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("stored history cleared"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "failed to clear stored history"),
        }
    }
}
