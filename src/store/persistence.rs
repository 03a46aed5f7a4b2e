//! Durable storage for the persisted notification record.
//!
//! The store treats storage as a single-key record: load it once at start,
//! overwrite it after every mutation, remove it on a full reset.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::Result;

/// A single durable record holding the serialized notification state.
pub trait StateStorage: Send {
    /// Returns the stored record, or `None` if nothing has been saved.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`](crate::RelayError) if the backing medium
    /// cannot be read.
    fn load(&self) -> Result<Option<String>>;

    /// Replaces the stored record.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`](crate::RelayError) if the record cannot be
    /// written.
    fn save(&self, record: &str) -> Result<()>;

    /// Deletes the stored record. Removing a missing record succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`](crate::RelayError) if the record exists but
    /// cannot be removed.
    fn remove(&self) -> Result<()>;
}

/// JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl StateStorage for FileStorage {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, record: &str) -> Result<()> {
        // Atomic replace through a sibling temp file.
        let temp = self.temp_path();
        std::fs::write(&temp, record)?;
        std::fs::rename(&temp, &self.path)?;
        debug!(path = %self.path.display(), bytes = record.len(), "Saved notification record");
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process storage. Clones share the same record, so a test can keep a
/// handle and reload a fresh store from it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    record: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a record.
    pub fn with_record(record: impl Into<String>) -> Self {
        Self {
            record: Arc::new(Mutex::new(Some(record.into()))),
        }
    }

    /// Current record contents.
    pub fn snapshot(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.record.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.snapshot())
    }

    fn save(&self, record: &str) -> Result<()> {
        *self.lock() = Some(record.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }
}
