//! Durable backends for the auth record.
//!
//! `FileStorage` is the long-lived client's equivalent of browser local
//! storage; `MemoryStorage` backs tests and one-shot processes.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::token::AuthRecord;

/// Synchronous key-value slot holding at most one [`AuthRecord`].
pub trait TokenStorage: Send + Sync {
    /// Read the stored record, `None` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or holds garbage.
    fn load(&self) -> Result<Option<AuthRecord>, StorageError>;

    /// Replace the stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn save(&self, record: &AuthRecord) -> Result<(), StorageError>;

    /// Delete the stored record. Removing an absent record is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self) -> Result<(), StorageError>;
}

// =============================================================================
// MEMORY
// =============================================================================

#[derive(Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<AuthRecord>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryStorage {
    fn load(&self) -> Result<Option<AuthRecord>, StorageError> {
        let slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(slot.clone())
    }

    fn save(&self, record: &AuthRecord) -> Result<(), StorageError> {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Some(record.clone());
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = None;
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// JSON file holding the record. Writes go through a sibling temp file and a
/// rename so a crash never leaves a half-written record behind.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TokenStorage for FileStorage {
    fn load(&self) -> Result<Option<AuthRecord>, StorageError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, record: &AuthRecord) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        std::fs::write(&tmp, serde_json::to_vec(record)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
