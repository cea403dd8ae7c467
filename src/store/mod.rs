//! Key-value cache stores backing the range tiers.
//!
//! The engine only needs `get`/`has`/`put`/`forever`/`forget` with per-entry
//! expiry. Two adapters are provided:
//! - [`MemoryStore`] - process-local, for embedding and tests
//! - [`FileStore`] - JSON document on disk, shared between CLI invocations

mod file;
mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::{CacheConfig, StoreKind};
use crate::error::Result;

/// A value held by the cache store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CacheValue {
    Ranges(Vec<String>),
    Timestamp(DateTime<Utc>),
}

impl CacheValue {
    pub fn into_ranges(self) -> Option<Vec<String>> {
        match self {
            CacheValue::Ranges(ranges) => Some(ranges),
            CacheValue::Timestamp(_) => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            CacheValue::Timestamp(ts) => Some(*ts),
            CacheValue::Ranges(_) => None,
        }
    }
}

/// Trait for cache stores.
///
/// Every write is atomic per key; there is no multi-key transaction.
pub trait CacheStore: Send + Sync {
    /// Store name shown in diagnostics
    fn name(&self) -> &'static str;

    /// Read a live (non-expired) entry
    fn get(&self, key: &str) -> Result<Option<CacheValue>>;

    /// Check whether a live entry exists
    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Store with expiry. A zero TTL removes the key.
    fn put(&self, key: &str, value: CacheValue, ttl: Duration) -> Result<()>;

    /// Store without expiry
    fn forever(&self, key: &str, value: CacheValue) -> Result<()>;

    /// Delete a key, returning whether it existed
    fn forget(&self, key: &str) -> Result<bool>;
}

/// Create the store selected in configuration
pub fn create_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    match config.store {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::File => Ok(Arc::new(FileStore::open(&config.path)?)),
    }
}
