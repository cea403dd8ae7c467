//! Resolution and refresh engine.
//!
//! ```text
//! read:    current ──► last_good (allow_stale) ──► auto-fetch ──► fallback ──► empty / error
//! refresh: fetch v4 ║ fetch v6 ──► both non-empty? ──► current ×3 ──► last_good ×3
//! ```
//!
//! The engine is stateless apart from what lives in the cache store. Per-request
//! memoization lives in a [`Resolver`], created per unit of work.

mod guard;
mod refresh;
mod resolver;

use std::sync::Arc;
use tracing::warn;

pub use resolver::{Resolution, Resolver};

use crate::config::{AutoFetchConfig, CacheConfig, Config, FallbackConfig};
use crate::error::Result;
use crate::events::{create_sink, EventSink};
use crate::family::{RangeKind, RangeList, Tier};
use crate::fetcher::{Fetcher, RangeSource};
use crate::store::{create_store, CacheStore};
use crate::RangeError;

/// Settings the engine reads on every operation
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub cache: CacheConfig,
    pub auto_fetch: AutoFetchConfig,
    pub fallback: FallbackConfig,
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            cache: config.cache.clone(),
            auto_fetch: config.auto_fetch.clone(),
            fallback: config.fallback.clone(),
        }
    }
}

/// Which tiers `clear` removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    Current,
    LastGood,
    Both,
}

impl ClearTarget {
    pub fn tiers(self) -> &'static [Tier] {
        match self {
            ClearTarget::Current => &[Tier::Current],
            ClearTarget::LastGood => &[Tier::LastGood],
            ClearTarget::Both => &Tier::BOTH,
        }
    }
}

/// Multi-tier range engine
pub struct Engine {
    store: Arc<dyn CacheStore>,
    source: Arc<dyn RangeSource>,
    events: Arc<dyn EventSink>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        store: Arc<dyn CacheStore>,
        source: Arc<dyn RangeSource>,
        events: Arc<dyn EventSink>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            source,
            events,
            settings,
        }
    }

    /// Wire the configured store, HTTP fetcher and event sinks
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = create_store(&config.cache)?;
        let source = Arc::new(Fetcher::new(&config.http, &config.logging)?);
        let events = create_sink(&config.events).map_err(|e| RangeError::Config(e.to_string()))?;
        Ok(Self::new(store, source, events, EngineSettings::from(config)))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &dyn CacheStore {
        self.store.as_ref()
    }

    /// Start a new unit of work with its own memo
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self)
    }

    /// IPv4 ranges, resolved in a fresh unit of work
    pub async fn ipv4(&self) -> Result<RangeList> {
        self.resolver().ipv4().await
    }

    /// IPv6 ranges, resolved in a fresh unit of work
    pub async fn ipv6(&self) -> Result<RangeList> {
        self.resolver().ipv6().await
    }

    /// Merged ranges, resolved in a fresh unit of work
    pub async fn all(&self) -> Result<RangeList> {
        self.resolver().all().await
    }

    /// Delete segments of the selected tiers; returns the removed keys
    pub fn clear(&self, target: ClearTarget) -> Result<Vec<String>> {
        let mut cleared = Vec::new();
        for &tier in target.tiers() {
            for kind in RangeKind::ALL_KINDS {
                let key = self.settings.cache.keys.key(tier, kind);
                self.store.forget(key)?;
                cleared.push(key.to_string());
            }
        }
        Ok(cleared)
    }

    /// Read one segment; a store failure reads as empty
    pub(crate) fn read_segment(&self, tier: Tier, kind: RangeKind) -> RangeList {
        let key = self.settings.cache.keys.key(tier, kind);
        match self.store.get(key) {
            Ok(Some(value)) => value.into_ranges().unwrap_or_default(),
            Ok(None) => RangeList::new(),
            Err(e) => {
                warn!("Failed to read {} {} from cache ({}): {}", tier, kind, key, e);
                RangeList::new()
            }
        }
    }

    pub(crate) fn emit(&self, event: &crate::events::RangeEvent) {
        self.events.emit(event);
    }

    /// Wait up to `timeout` for event deliveries still in flight.
    /// Call before the runtime shuts down.
    pub async fn flush_events(&self, timeout: std::time::Duration) {
        self.events.flush(timeout).await;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::events::MemorySink;
    use crate::fetcher::MockRangeSource;
    use crate::family::IpFamily;
    use crate::store::MemoryStore;

    pub(crate) fn strings(items: &[&str]) -> RangeList {
        items.iter().map(|s| s.to_string()).collect()
    }

    pub(crate) struct Harness {
        pub store: Arc<MemoryStore>,
        pub events: Arc<MemorySink>,
        pub engine: Engine,
    }

    pub(crate) fn harness(source: MockRangeSource, settings: EngineSettings) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(MemorySink::new());
        let engine = Engine::new(store.clone(), Arc::new(source), events.clone(), settings);
        Harness {
            store,
            events,
            engine,
        }
    }

    /// Defaults with auto-fetch turned off, for tests that read a cold cache
    pub(crate) fn without_auto_fetch() -> EngineSettings {
        let mut settings = EngineSettings::default();
        settings.auto_fetch.enabled = false;
        settings
    }

    /// Source answering every fetch with fixed lists
    pub(crate) fn fixed_source(v4: &[&str], v6: &[&str]) -> MockRangeSource {
        let v4 = strings(v4);
        let v6 = strings(v6);
        let mut source = MockRangeSource::new();
        source.expect_fetch().returning(move |family| match family {
            IpFamily::V4 => v4.clone(),
            IpFamily::V6 => v6.clone(),
        });
        source
    }

    /// Source that must never be called
    pub(crate) fn silent_source() -> MockRangeSource {
        let mut source = MockRangeSource::new();
        source.expect_fetch().never();
        source
    }
}
