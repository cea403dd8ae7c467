//! Refresh orchestration: fetch both families, commit all-or-nothing.

use std::time::Duration;
use tracing::{debug, warn};

use super::Engine;
use crate::error::Result;
use crate::events::RangeEvent;
use crate::family::{IpFamily, RangeKind, RangeList, Tier};
use crate::store::CacheValue;
use crate::validation::merge_families;

impl Engine {
    /// Fetch both families and commit them if neither came back empty.
    ///
    /// Returns `Ok(false)` without touching the cache when either family is
    /// empty. `Err` means a cache write failed mid-commit.
    pub async fn refresh(&self) -> Result<bool> {
        let (ipv4, ipv6) = self.fetch_both().await;
        self.apply(ipv4, ipv6)
    }

    /// Like [`Engine::refresh`], but gives up fetching after `deadline`.
    /// An elapsed deadline counts as both families fetched empty.
    pub async fn refresh_within(&self, deadline: Duration) -> Result<bool> {
        let (ipv4, ipv6) = match tokio::time::timeout(deadline, self.fetch_both()).await {
            Ok(lists) => lists,
            Err(_) => {
                warn!("Refresh deadline of {:?} elapsed before both fetches completed", deadline);
                (RangeList::new(), RangeList::new())
            }
        };
        self.apply(ipv4, ipv6)
    }

    async fn fetch_both(&self) -> (RangeList, RangeList) {
        tokio::join!(
            self.source.fetch(IpFamily::V4),
            self.source.fetch(IpFamily::V6)
        )
    }

    fn apply(&self, ipv4: RangeList, ipv6: RangeList) -> Result<bool> {
        if ipv4.is_empty() || ipv6.is_empty() {
            self.emit(&RangeEvent::RefreshFailed {
                ipv4_empty: ipv4.is_empty(),
                ipv6_empty: ipv6.is_empty(),
            });
            return Ok(false);
        }

        let all = merge_families(&ipv4, &ipv6);
        self.commit(&ipv4, &ipv6, &all)?;

        self.emit(&RangeEvent::RangesRefreshed { ipv4, ipv6 });
        Ok(true)
    }

    /// Current tiers first, then last_good, with last_good.all written last
    fn commit(&self, ipv4: &RangeList, ipv6: &RangeList, all: &RangeList) -> Result<()> {
        let segments = [
            (RangeKind::V4, ipv4),
            (RangeKind::V6, ipv6),
            (RangeKind::All, all),
        ];
        let keys = &self.settings.cache.keys;

        for (kind, ranges) in segments {
            let key = keys.key(Tier::Current, kind);
            let value = CacheValue::Ranges(ranges.clone());
            match self.settings.cache.ttl_duration() {
                Some(ttl) => self.store.put(key, value, ttl)?,
                None => self.store.forever(key, value)?,
            }
        }

        for (kind, ranges) in segments {
            let key = keys.key(Tier::LastGood, kind);
            self.store.forever(key, CacheValue::Ranges(ranges.clone()))?;
        }

        debug!(
            "Committed {} IPv4, {} IPv6, {} merged ranges",
            ipv4.len(),
            ipv6.len(),
            all.len()
        );
        Ok(())
    }
}
