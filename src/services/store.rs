//! Session store: one pretty-printed JSON file per chat session.
//!
//! DESIGN
//! ======
//! Files are named `chat_{username}_{session_id}.json` inside a single log
//! directory. The file name is the only join key between a user and a
//! record. Saves overwrite the whole file (temp file + rename) without any
//! locking, so concurrent writers to the same session race and the last one
//! wins.
//!
//! ERROR HANDLING
//! ==============
//! Directory scans isolate per-file failures: an unreadable or malformed
//! record is logged and skipped so one bad file never hides the rest. Write
//! failures are never isolated; they surface as `StorageUnavailable`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, warn};

use crate::services::chat::ChatSession;

pub const DEFAULT_LOG_DIR: &str = "chat_logs";
const RECORD_EXTENSION: &str = "json";
const JSON_INDENT: &[u8] = b"    ";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("chat log storage unavailable at {}: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed session record {filename}: {reason}")]
    MalformedRecord { filename: String, reason: String },
    #[error("session not found: {0}")]
    NotFound(String),
}

impl crate::error::ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::StorageUnavailable { .. } => "E_STORAGE_UNAVAILABLE",
            Self::MalformedRecord { .. } => "E_MALFORMED_RECORD",
            Self::NotFound(_) => "E_SESSION_NOT_FOUND",
        }
    }
}

/// A successfully parsed session file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub filename: String,
    pub session: ChatSession,
}

/// Flat-file store rooted at a single log directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

// =============================================================================
// STORE
// =============================================================================

impl SessionStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the log directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::StorageUnavailable { path: self.dir.clone(), source })
    }

    /// File name for a session: `chat_{username}_{session_id}.json`.
    #[must_use]
    pub fn filename(username: &str, session_id: &str) -> String {
        format!("chat_{username}_{session_id}.{RECORD_EXTENSION}")
    }

    #[must_use]
    pub fn exists(&self, username: &str, session_id: &str) -> bool {
        self.dir.join(Self::filename(username, session_id)).is_file()
    }

    /// Stamp the session with the current local time and overwrite its file.
    pub fn save(&self, session: &mut ChatSession) -> Result<PathBuf, StoreError> {
        self.save_at(session, Local::now().naive_local())
    }

    /// Stamp the session with `at` and overwrite its file.
    pub fn save_at(&self, session: &mut ChatSession, at: NaiveDateTime) -> Result<PathBuf, StoreError> {
        session.timestamp = Some(at);
        self.ensure_dir()?;

        let filename = Self::filename(&session.username, &session.session_id);
        let path = self.dir.join(&filename);
        let body = to_pretty_json(session)
            .map_err(|e| StoreError::StorageUnavailable { path: path.clone(), source: io::Error::other(e) })?;

        // Write beside the target, then swap it in, so readers never see a torn file.
        let tmp_path = self.dir.join(format!(".{filename}.tmp"));
        fs::write(&tmp_path, body)
            .and_then(|()| fs::rename(&tmp_path, &path))
            .map_err(|source| StoreError::StorageUnavailable { path: path.clone(), source })?;

        debug!(path = %path.display(), messages = session.chat_history.len(), "session saved");
        Ok(path)
    }

    /// Parse one session file from the log directory.
    pub fn load(&self, filename: &str) -> Result<ChatSession, StoreError> {
        let path = self.dir.join(filename);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound(filename.to_owned())),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(StoreError::MalformedRecord { filename: filename.to_owned(), reason: e.to_string() });
            }
            Err(source) => return Err(StoreError::StorageUnavailable { path, source }),
        };

        serde_json::from_str(&raw)
            .map_err(|e| StoreError::MalformedRecord { filename: filename.to_owned(), reason: e.to_string() })
    }

    /// Load a user's session by the file naming convention.
    pub fn find(&self, username: &str, session_id: &str) -> Result<ChatSession, StoreError> {
        match self.load(&Self::filename(username, session_id)) {
            Err(StoreError::NotFound(_)) => Err(StoreError::NotFound(session_id.to_owned())),
            other => other,
        }
    }

    /// Parse every `*.json` record, in directory enumeration order.
    ///
    /// A missing directory is an empty store. Files that fail to load are
    /// skipped with a warning.
    pub fn scan(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::StorageUnavailable { path: self.dir.clone(), source }),
        };

        let mut records = Vec::new();
        let mut skipped = 0_usize;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            match self.load(filename) {
                Ok(session) => records.push(StoredRecord { filename: filename.to_owned(), session }),
                Err(e) => {
                    skipped += 1;
                    warn!(error = %e, filename, "skipping unreadable session record");
                }
            }
        }

        debug!(dir = %self.dir.display(), records = records.len(), skipped, "chat log directory scanned");
        Ok(records)
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
