//! Auto-fetch guard: refresh on a cold read, at most once per cooldown window.
//!
//! The marker is a best-effort throttle shared by all families, not a lock.
//! Two racing readers may both refresh; the last writer wins.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, warn};

use super::Engine;
use crate::events::RangeEvent;
use crate::family::RangeKind;
use crate::store::CacheValue;

impl Engine {
    /// Time of the last recorded auto-fetch attempt, if the marker is live
    pub fn last_auto_fetch_attempt(&self) -> Option<DateTime<Utc>> {
        match self.store.get(&self.settings.auto_fetch.key) {
            Ok(value) => value.and_then(|v| v.as_timestamp()),
            Err(e) => {
                warn!("Failed to read auto-fetch marker: {}", e);
                None
            }
        }
    }

    /// Whether an auto-fetch now would be skipped. Read-only.
    pub fn is_auto_fetch_rate_limited(&self) -> bool {
        let cooldown = self.settings.auto_fetch.rate_limit;
        if cooldown == 0 {
            return false;
        }
        match self.last_auto_fetch_attempt() {
            Some(last) => {
                let elapsed = Utc::now().signed_duration_since(last).num_seconds();
                elapsed < cooldown as i64
            }
            None => false,
        }
    }

    fn record_auto_fetch_attempt(&self) {
        let ttl = Duration::from_secs(self.settings.auto_fetch.rate_limit);
        let marker = CacheValue::Timestamp(Utc::now());
        if let Err(e) = self.store.put(&self.settings.auto_fetch.key, marker, ttl) {
            warn!("Failed to record auto-fetch attempt: {}", e);
        }
    }

    /// Try to self-heal a cold cache. Returns true when a refresh committed.
    pub(crate) async fn auto_fetch(&self, kind: RangeKind) -> bool {
        if self.is_auto_fetch_rate_limited() {
            debug!("Auto-fetch for {} rate limited", kind);
            self.emit(&RangeEvent::AutoFetchAttempted {
                kind,
                was_rate_limited: true,
                was_successful: false,
            });
            return false;
        }

        // Recorded before the attempt so the cooldown holds even if it fails
        self.record_auto_fetch_attempt();

        let was_successful = match self.refresh().await {
            Ok(committed) => committed,
            Err(e) => {
                warn!("Auto-fetch for {} could not commit: {}", kind, e);
                false
            }
        };

        self.emit(&RangeEvent::AutoFetchAttempted {
            kind,
            was_rate_limited: false,
            was_successful,
        });
        was_successful
    }
}
