//! In-process cache store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{CacheStore, CacheValue};
use crate::error::{RangeError, Result};

struct Entry {
    value: CacheValue,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Cache store held in process memory
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| RangeError::Store("memory store lock poisoned".to_string()))
    }

    fn insert(&self, key: &str, value: CacheValue, expires_at: Option<Instant>) -> Result<()> {
        self.lock()?
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }
}

impl CacheStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        let live = match entries.get(key) {
            Some(entry) => entry.is_live(now),
            None => return Ok(None),
        };
        if live {
            Ok(entries.get(key).map(|entry| entry.value.clone()))
        } else {
            entries.remove(key);
            Ok(None)
        }
    }

    fn put(&self, key: &str, value: CacheValue, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            self.forget(key)?;
            return Ok(());
        }
        self.insert(key, value, Some(Instant::now() + ttl))
    }

    fn forever(&self, key: &str, value: CacheValue) -> Result<()> {
        self.insert(key, value, None)
    }

    fn forget(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }
}
