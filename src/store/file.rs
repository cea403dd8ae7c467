//! File-backed cache store.
//!
//! All entries live in one JSON document. Writes take an exclusive advisory
//! lock on a sibling `.lock` file, rewrite the document into a temporary file
//! in the same directory and rename it over the original, so readers never see
//! a half-written document.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{CacheStore, CacheValue};
use crate::error::{RangeError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileEntry {
    value: CacheValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl FileEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    entries: BTreeMap<String, FileEntry>,
}

/// Cache store persisted as a JSON file
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

fn store_err(context: &str, path: &Path, err: impl std::fmt::Display) -> RangeError {
    RangeError::Store(format!("{} {:?}: {}", context, path, err))
}

impl FileStore {
    /// Open (without creating) a store at `path`. The parent directory is
    /// created on first write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.file_name().is_none() {
            return Err(RangeError::Store(format!(
                "Cache path {:?} has no file name",
                path
            )));
        }
        let mut lock_name = path.file_name().unwrap_or_default().to_os_string();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Ok(Self { path, lock_path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_lock(&self) -> Result<File> {
        if let Some(parent) = self.lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| store_err("Failed to create cache directory", parent, e))?;
            }
        }
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| store_err("Failed to open lock file", &self.lock_path, e))
    }

    /// Open the lock file for a shared read lock. Never creates anything;
    /// `None` when the lock file does not exist or is not readable.
    fn open_read_lock(&self) -> Option<File> {
        match File::open(&self.lock_path) {
            Ok(file) => Some(file),
            Err(e) => {
                debug!("Reading {:?} without lock: {}", self.path, e);
                None
            }
        }
    }

    fn release(&self, lock: File) {
        if let Err(e) = lock.unlock() {
            debug!("Failed to unlock {:?}: {}", self.lock_path, e);
        }
    }

    fn read_content(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| store_err("Failed to read cache file", &self.path, e))?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(content))
    }

    fn read_document(&self) -> Result<StoreDocument> {
        match self.read_content()? {
            Some(content) => serde_json::from_str(&content)
                .map_err(|e| store_err("Failed to parse cache file", &self.path, e)),
            None => Ok(StoreDocument::default()),
        }
    }

    /// Like [`Self::read_document`], but an unparseable document starts over
    /// empty so the next write replaces it.
    fn read_document_for_write(&self) -> Result<StoreDocument> {
        let Some(content) = self.read_content()? else {
            return Ok(StoreDocument::default());
        };
        match serde_json::from_str(&content) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                warn!(
                    "Cache file {:?} is corrupt ({}), rewriting it",
                    self.path, e
                );
                Ok(StoreDocument::default())
            }
        }
    }

    fn write_document(&self, doc: &StoreDocument) -> Result<()> {
        let content = serde_json::to_string_pretty(doc)
            .map_err(|e| store_err("Failed to serialize cache for", &self.path, e))?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut temp_file = NamedTempFile::new_in(parent)
            .map_err(|e| store_err("Failed to create temporary file in", parent, e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| store_err("Failed to write temporary cache file for", &self.path, e))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| store_err("Failed to sync temporary cache file for", &self.path, e))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| store_err("Failed to persist cache file", &self.path, e.error))?;
        Ok(())
    }

    /// Read the live entry, under a shared lock when the lock file exists
    fn read_entry(&self, key: &str) -> Result<Option<CacheValue>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let doc = match self.open_read_lock() {
            Some(lock) => {
                lock.lock_shared()
                    .map_err(|e| store_err("Failed to lock", &self.lock_path, e))?;
                let doc = self.read_document();
                self.release(lock);
                doc?
            }
            None => self.read_document()?,
        };

        let now = Utc::now();
        Ok(doc
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    /// Read-modify-write under an exclusive lock; expired entries are pruned
    fn modify<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut BTreeMap<String, FileEntry>) -> T,
    {
        let lock = self.open_lock()?;
        lock.lock_exclusive()
            .map_err(|e| store_err("Failed to lock", &self.lock_path, e))?;

        let result = self.read_document_for_write().and_then(|mut doc| {
            let now = Utc::now();
            doc.entries.retain(|_, entry| entry.is_live(now));
            let out = f(&mut doc.entries);
            self.write_document(&doc)?;
            Ok(out)
        });

        self.release(lock);
        result
    }

    pub(crate) fn write_entry(
        &self,
        key: &str,
        value: CacheValue,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), FileEntry { value, expires_at });
        })
    }
}

impl CacheStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        self.read_entry(key)
    }

    fn put(&self, key: &str, value: CacheValue, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            self.forget(key)?;
            return Ok(());
        }
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| RangeError::Store(format!("TTL out of range: {}", e)))?;
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| RangeError::Store("TTL out of range".to_string()))?;
        self.write_entry(key, value, Some(expires_at))
    }

    fn forever(&self, key: &str, value: CacheValue) -> Result<()> {
        self.write_entry(key, value, None)
    }

    fn forget(&self, key: &str) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let removed = self.modify(|entries| entries.remove(key).is_some())?;
        if removed {
            debug!("Removed cache key {}", key);
        }
        Ok(removed)
    }
}
