//! Key-value persistence for the local credential cache.
//!
//! # Design
//! The browser's `localStorage` is modelled as the `KeyValueStore` trait so
//! the session can run against an in-memory map in tests and a JSON file on
//! disk elsewhere. `set_all` and `remove_all` exist so stores that can apply
//! several changes at once (like `FileStore`) do so. The default
//! `set_all` restores every key it already wrote when a later write fails;
//! the default `remove_all` attempts every key before reporting.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("storage file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// String-to-string store with get/set/remove semantics.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    /// Write every entry or none of them.
    fn set_all(&mut self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut written: Vec<(&str, Option<String>)> = Vec::with_capacity(entries.len());
        for &(key, value) in entries {
            let outcome = self
                .get(key)
                .and_then(|previous| self.set(key, value).map(|()| previous));
            match outcome {
                Ok(previous) => written.push((key, previous)),
                Err(err) => {
                    for (key, previous) in written.into_iter().rev() {
                        let restored = match previous {
                            Some(previous) => self.set(key, &previous),
                            None => self.remove(key),
                        };
                        if let Err(rollback) = restored {
                            warn!(key, error = %rollback, "failed to roll back partial write");
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Remove every key, continuing past failures. Returns the first error.
    fn remove_all(&mut self, keys: &[&str]) -> Result<(), StorageError> {
        let mut first_error = None;
        for &key in keys {
            if let Err(err) = self.remove(key) {
                warn!(key, error = %err, "failed to remove key");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Process-local store. Contents vanish with the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store persisted as a flat JSON object in a single file.
///
/// Every mutation rewrites the whole file through a sibling temporary file
/// and a rename, so a crash leaves either the old or the new contents. The
/// in-memory copy is only updated after the write succeeded.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = entries.len(), "opened file store");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&mut self, next: BTreeMap<String, String>) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(&next).map_err(|e| StorageError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        self.entries = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_all(&[(key, value)])
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.remove_all(&[key])
    }

    fn set_all(&mut self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut next = self.entries.clone();
        for (key, value) in entries {
            next.insert((*key).to_string(), (*value).to_string());
        }
        self.commit(next)
    }

    fn remove_all(&mut self, keys: &[&str]) -> Result<(), StorageError> {
        let mut next = self.entries.clone();
        for key in keys {
            next.remove(*key);
        }
        self.commit(next)
    }
}
