//! Per-unit-of-work resolution with memoization.
//!
//! A `Resolver` must not be shared between concurrent requests: it caches
//! what it has already resolved and which families it has already warned about.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::Engine;
use crate::error::{RangeError, Result};
use crate::family::{IpFamily, Provenance, RangeKind, RangeList, Tier};
use crate::validation::merge_families;

/// A resolved list together with the tier it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub ranges: RangeList,
    pub provenance: Provenance,
}

pub struct Resolver<'a> {
    engine: &'a Engine,
    memo: HashMap<RangeKind, Resolution>,
    warned: HashSet<RangeKind>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Self {
            engine,
            memo: HashMap::new(),
            warned: HashSet::new(),
        }
    }

    pub async fn ipv4(&mut self) -> Result<RangeList> {
        self.resolve(RangeKind::V4).await
    }

    pub async fn ipv6(&mut self) -> Result<RangeList> {
        self.resolve(RangeKind::V6).await
    }

    pub async fn all(&mut self) -> Result<RangeList> {
        self.resolve(RangeKind::All).await
    }

    pub async fn resolve(&mut self, kind: RangeKind) -> Result<RangeList> {
        Ok(self.resolve_traced(kind).await?.ranges)
    }

    /// Resolve and report which tier answered
    pub async fn resolve_traced(&mut self, kind: RangeKind) -> Result<Resolution> {
        if let Some(hit) = self.memo.get(&kind) {
            return Ok(hit.clone());
        }

        let resolution = self.walk_chain(kind).await?;
        debug!(
            "Resolved {} from {} ({} ranges)",
            kind,
            resolution.provenance.as_str(),
            resolution.ranges.len()
        );
        self.memo.insert(kind, resolution.clone());
        Ok(resolution)
    }

    /// Refresh through the engine, dropping everything memoized so far
    pub async fn refresh(&mut self) -> Result<bool> {
        self.memo.clear();
        self.engine.refresh().await
    }

    /// Forget memoized results without refreshing
    pub fn reset(&mut self) {
        self.memo.clear();
    }

    async fn walk_chain(&mut self, kind: RangeKind) -> Result<Resolution> {
        if let Some(found) = self.read_tiers(kind) {
            return Ok(found);
        }

        let auto_fetch = &self.engine.settings.auto_fetch;
        if auto_fetch.enabled && self.engine.auto_fetch(kind).await {
            // The refresh invalidated anything resolved earlier in this unit of work
            self.memo.clear();
            let ranges = self.engine.read_segment(Tier::Current, kind);
            if !ranges.is_empty() {
                return Ok(Resolution {
                    ranges,
                    provenance: Provenance::Current,
                });
            }
        }

        let fallback = self.fallback(kind);
        if !fallback.is_empty() {
            return Ok(Resolution {
                ranges: fallback,
                provenance: Provenance::Fallback,
            });
        }

        if self.engine.settings.cache.throw_on_empty {
            return Err(RangeError::EmptyCache { kind });
        }

        if self.warned.insert(kind) {
            warn!(
                "No IP ranges available for {} (cache empty, no fallback configured)",
                kind
            );
        }
        Ok(Resolution {
            ranges: RangeList::new(),
            provenance: Provenance::Empty,
        })
    }

    fn read_tiers(&self, kind: RangeKind) -> Option<Resolution> {
        let current = self.engine.read_segment(Tier::Current, kind);
        if !current.is_empty() {
            return Some(Resolution {
                ranges: current,
                provenance: Provenance::Current,
            });
        }

        if self.engine.settings.cache.allow_stale {
            let last_good = self.engine.read_segment(Tier::LastGood, kind);
            if !last_good.is_empty() {
                return Some(Resolution {
                    ranges: last_good,
                    provenance: Provenance::LastGood,
                });
            }
        }

        None
    }

    fn fallback(&self, kind: RangeKind) -> RangeList {
        let fallback = &self.engine.settings.fallback;
        match kind {
            RangeKind::V4 => fallback.for_family(IpFamily::V4).to_vec(),
            RangeKind::V6 => fallback.for_family(IpFamily::V6).to_vec(),
            RangeKind::All => merge_families(&fallback.ipv4, &fallback.ipv6),
        }
    }
}
