//! Read-only cache diagnostics.
//!
//! Building a report only reads the store: no network traffic, and the
//! auto-fetch marker is never touched.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::engine::Engine;
use crate::family::{RangeKind, Tier};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentInfo {
    pub key: String,
    pub present: bool,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierInfo {
    pub v4: SegmentInfo,
    pub v6: SegmentInfo,
    pub all: SegmentInfo,
}

impl TierInfo {
    pub fn segment(&self, kind: RangeKind) -> &SegmentInfo {
        match kind {
            RangeKind::V4 => &self.v4,
            RangeKind::V6 => &self.v6,
            RangeKind::All => &self.all,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segments {
    pub current: TierInfo,
    pub last_good: TierInfo,
}

impl Segments {
    pub fn tier(&self, tier: Tier) -> &TierInfo {
        match tier {
            Tier::Current => &self.current,
            Tier::LastGood => &self.last_good,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackInfo {
    pub ipv4_count: usize,
    pub ipv6_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoFetchInfo {
    pub enabled: bool,
    pub rate_limit: u64,
    pub currently_rate_limited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,
}

/// Snapshot of cache state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub store: String,
    /// Seconds; `None` means entries never expire
    pub configured_ttl: Option<u64>,
    pub allow_stale: bool,
    pub segments: Segments,
    pub fallback: FallbackInfo,
    pub auto_fetch: AutoFetchInfo,
}

impl Engine {
    /// Describe what the cache currently holds
    pub fn report(&self) -> CacheInfo {
        let settings = self.settings();

        CacheInfo {
            store: self.store().name().to_string(),
            configured_ttl: settings.cache.ttl,
            allow_stale: settings.cache.allow_stale,
            segments: Segments {
                current: self.tier_info(Tier::Current),
                last_good: self.tier_info(Tier::LastGood),
            },
            fallback: FallbackInfo {
                ipv4_count: settings.fallback.ipv4.len(),
                ipv6_count: settings.fallback.ipv6.len(),
            },
            auto_fetch: AutoFetchInfo {
                enabled: settings.auto_fetch.enabled,
                rate_limit: settings.auto_fetch.rate_limit,
                currently_rate_limited: self.is_auto_fetch_rate_limited(),
                last_attempt: self.last_auto_fetch_attempt(),
            },
        }
    }

    fn tier_info(&self, tier: Tier) -> TierInfo {
        TierInfo {
            v4: self.segment_info(tier, RangeKind::V4),
            v6: self.segment_info(tier, RangeKind::V6),
            all: self.segment_info(tier, RangeKind::All),
        }
    }

    fn segment_info(&self, tier: Tier, kind: RangeKind) -> SegmentInfo {
        let key = self.settings().cache.keys.key(tier, kind).to_string();
        let (present, count) = match self.store().get(&key) {
            Ok(Some(value)) => (true, value.into_ranges().map_or(0, |r| r.len())),
            Ok(None) => (false, 0),
            Err(e) => {
                warn!("Failed to inspect cache key {}: {}", key, e);
                (false, 0)
            }
        };
        SegmentInfo {
            key,
            present,
            count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::*;
    use crate::engine::EngineSettings;

    #[test]
    fn test_report_on_empty_cache() {
        let mut settings = EngineSettings::default();
        settings.auto_fetch.enabled = true;
        settings.auto_fetch.rate_limit = 600;
        settings.fallback.ipv4 = strings(&["173.245.48.0/20"]);
        let h = harness(silent_source(), settings);

        let info = h.engine.report();
        assert_eq!(info.store, "memory");
        assert_eq!(info.configured_ttl, Some(86400));
        assert!(info.allow_stale);
        for tier in Tier::BOTH {
            for kind in RangeKind::ALL_KINDS {
                let segment = info.segments.tier(tier).segment(kind);
                assert!(!segment.present);
                assert_eq!(segment.count, 0);
            }
        }
        assert_eq!(
            info.fallback,
            FallbackInfo {
                ipv4_count: 1,
                ipv6_count: 0
            }
        );
        assert_eq!(
            info.auto_fetch,
            AutoFetchInfo {
                enabled: true,
                rate_limit: 600,
                currently_rate_limited: false,
                last_attempt: None,
            }
        );
        assert!(h.events.events().is_empty());
    }

    #[tokio::test]
    async fn test_report_after_refresh() {
        let h = harness(
            fixed_source(&["1.1.1.1/32", "10.0.0.0/8"], &["2606:4700::/32"]),
            EngineSettings::default(),
        );
        assert!(h.engine.refresh().await.unwrap());

        let info = h.engine.report();
        for tier in Tier::BOTH {
            let tier_info = info.segments.tier(tier);
            assert!(tier_info.v4.present);
            assert_eq!(tier_info.v4.count, 2);
            assert_eq!(tier_info.v6.count, 1);
            assert_eq!(tier_info.all.count, 3);
        }
        assert_eq!(info.segments.current.all.key, "edgeranges:ips:current");
    }

    #[tokio::test]
    async fn test_report_shows_rate_limit_after_auto_fetch() {
        let mut settings = EngineSettings::default();
        settings.auto_fetch.enabled = true;
        let h = harness(fixed_source(&["1.1.1.1/32"], &["2606:4700::/32"]), settings);

        h.engine.all().await.unwrap();
        let info = h.engine.report();
        assert!(info.auto_fetch.currently_rate_limited);
        assert!(info.auto_fetch.last_attempt.is_some());

        // Reporting again must not move the marker
        let again = h.engine.report();
        assert_eq!(again.auto_fetch.last_attempt, info.auto_fetch.last_attempt);
    }

    #[test]
    fn test_report_json_shape() {
        let h = harness(silent_source(), EngineSettings::default());
        let json = serde_json::to_value(h.engine.report()).unwrap();
        assert_eq!(json["segments"]["current"]["v4"]["present"], false);
        assert_eq!(json["configured_ttl"], 86400);
        assert!(json["auto_fetch"].get("last_attempt").is_none());
    }
}
