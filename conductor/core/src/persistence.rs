//! Session Persistence
//!
//! Keeps a snapshot of the conversation so it survives restarts. A snapshot
//! is the full message list serialised as JSON under a single key.
//!
//! Loading never fails: a missing or unreadable snapshot is an empty
//! history. Saving and clearing report errors, but callers treat them as
//! warnings rather than stopping the conversation.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::messages::Message;

/// Snapshot write or erase failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error
    #[error("session store I/O error at {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Snapshot could not be serialised
    #[error("failed to serialise session: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable storage for one conversation
pub trait SessionStore: Send {
    /// Replace the stored snapshot with `messages`
    fn save(&mut self, messages: &[Message]) -> Result<(), StoreError>;

    /// Read the stored snapshot; empty if absent or unreadable
    fn load(&self) -> Vec<Message>;

    /// Erase the stored snapshot
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// JSON file store at `<data_dir>/<key>.json`
#[derive(Clone, Debug)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Store for `key` inside `data_dir`
    ///
    /// The directory is created on first save.
    pub fn new(data_dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{key}.json")),
        }
    }

    /// Snapshot file location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn save(&mut self, messages: &[Message]) -> Result<(), StoreError> {
        let json = serde_json::to_vec(messages)?;

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| Self::io_error(dir, e))?;
        }

        // Write beside the target and rename so readers never see half a file
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp).map_err(|e| Self::io_error(&tmp, e))?;
            file.write_all(&json)
                .and_then(|()| file.sync_all())
                .map_err(|e| Self::io_error(&tmp, e))?;
        }
        std::fs::rename(&tmp, &self.path).map_err(|e| Self::io_error(&self.path, e))?;

        tracing::trace!(path = %self.path.display(), messages = messages.len(), "Saved session");
        Ok(())
    }

    fn load(&self) -> Vec<Message> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No saved session");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read saved session");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<Message>>(&bytes) {
            Ok(messages) => {
                tracing::info!(
                    path = %self.path.display(),
                    messages = messages.len(),
                    "Restored session"
                );
                messages
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Saved session is corrupt, starting empty"
                );
                Vec::new()
            }
        }
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(&self.path, e)),
        }
    }
}

/// In-memory store; clones share the same snapshot
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore {
    snapshot: Arc<Mutex<Option<Vec<Message>>>>,
}

impl MemorySessionStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a snapshot
    #[must_use]
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(Some(messages))),
        }
    }

    /// Whether a snapshot is present
    #[must_use]
    pub fn has_snapshot(&self) -> bool {
        self.snapshot
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&mut self, messages: &[Message]) -> Result<(), StoreError> {
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = Some(messages.to_vec());
        }
        Ok(())
    }

    fn load(&self) -> Vec<Message> {
        self.snapshot
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = None;
        }
        Ok(())
    }
}
