//! Events emitted by the engine (refreshes, failures, auto-fetch attempts).
//!
//! Delivery is fire-and-forget: a sink must never fail or block the caller.
//! Short-lived callers await [`EventSink::flush`] before shutting the runtime
//! down so queued deliveries are not cancelled.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::EventsConfig;
use crate::family::{RangeKind, RangeList};

/// Timeout for webhook deliveries
const WEBHOOK_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RangeEvent {
    /// A refresh committed new lists to both tiers
    RangesRefreshed { ipv4: RangeList, ipv6: RangeList },

    /// A refresh fetched at least one family empty and committed nothing
    RefreshFailed { ipv4_empty: bool, ipv6_empty: bool },

    /// A cold read considered refreshing the cache
    AutoFetchAttempted {
        kind: RangeKind,
        was_rate_limited: bool,
        was_successful: bool,
    },
}

/// Receiver of engine events
#[async_trait]
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RangeEvent);

    /// Wait up to `timeout` for deliveries still in flight
    async fn flush(&self, _timeout: Duration) {}
}

/// Writes events to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &RangeEvent) {
        match event {
            RangeEvent::RangesRefreshed { ipv4, ipv6 } => {
                info!(
                    "Ranges refreshed: {} IPv4, {} IPv6",
                    ipv4.len(),
                    ipv6.len()
                );
            }
            RangeEvent::RefreshFailed {
                ipv4_empty,
                ipv6_empty,
            } => {
                let mut empty = Vec::new();
                if *ipv4_empty {
                    empty.push("ipv4");
                }
                if *ipv6_empty {
                    empty.push("ipv6");
                }
                warn!(
                    "Refresh failed, keeping existing ranges (empty: {})",
                    empty.join(", ")
                );
            }
            RangeEvent::AutoFetchAttempted {
                kind,
                was_rate_limited,
                was_successful,
            } => {
                if *was_rate_limited {
                    debug!("Auto-fetch for {} skipped (rate limited)", kind);
                } else {
                    info!(
                        "Auto-fetch for {} {}",
                        kind,
                        if *was_successful { "succeeded" } else { "failed" }
                    );
                }
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RangeEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<RangeEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &RangeEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    source: &'static str,
    sent_at: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a RangeEvent,
}

/// Posts events as JSON to an HTTPS endpoint
pub struct WebhookSink {
    client: Client,
    url: String,
    pending: Mutex<JoinSet<()>>,
}

async fn deliver(client: &Client, url: &str, event: &RangeEvent) -> Result<()> {
    let payload = WebhookPayload {
        source: "edgeranges",
        sent_at: Utc::now(),
        event,
    };

    let response = client
        .post(url)
        .json(&payload)
        .send()
        .await
        .context("Failed to send webhook")?;

    if !response.status().is_success() {
        anyhow::bail!("Webhook returned {}", response.status());
    }

    debug!("Webhook delivered");
    Ok(())
}

impl WebhookSink {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client for webhook")?;
        Ok(Self {
            client,
            url: url.to_string(),
            pending: Mutex::new(JoinSet::new()),
        })
    }

    /// Deliver one event and wait for the response
    pub async fn send(&self, event: &RangeEvent) -> Result<()> {
        deliver(&self.client, &self.url, event).await
    }

    /// Number of deliveries spawned and not yet collected
    pub fn pending(&self) -> usize {
        self.pending.lock().map(|set| set.len()).unwrap_or(0)
    }
}

#[async_trait]
impl EventSink for WebhookSink {
    fn emit(&self, event: &RangeEvent) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No async runtime, webhook delivery skipped");
            return;
        };
        let Ok(mut pending) = self.pending.lock() else {
            warn!("Webhook queue poisoned, delivery skipped");
            return;
        };
        // Collect finished deliveries so a long-lived sink does not grow
        while pending.try_join_next().is_some() {}

        let client = self.client.clone();
        let url = self.url.clone();
        let event = event.clone();
        pending.spawn_on(
            async move {
                if let Err(e) = deliver(&client, &url, &event).await {
                    warn!("Webhook delivery failed: {:#}", e);
                }
            },
            &handle,
        );
    }

    async fn flush(&self, timeout: Duration) {
        let mut pending = match self.pending.lock() {
            Ok(mut set) => std::mem::take(&mut *set),
            Err(_) => return,
        };
        if pending.is_empty() {
            return;
        }

        let count = pending.len();
        let drained = tokio::time::timeout(timeout, async {
            while pending.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                "Gave up on {} of {} webhook deliveries after {:?}",
                pending.len(),
                count,
                timeout
            );
        }
    }
}

/// Forwards each event to several sinks
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanOut {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl EventSink for FanOut {
    fn emit(&self, event: &RangeEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }

    async fn flush(&self, timeout: Duration) {
        for sink in &self.sinks {
            sink.flush(timeout).await;
        }
    }
}

/// Build the sink chain for the given configuration
pub fn create_sink(config: &EventsConfig) -> Result<Arc<dyn EventSink>> {
    let mut sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(LogSink)];
    if let Some(ref url) = config.webhook_url {
        sinks.push(Arc::new(WebhookSink::new(url)?));
    }
    Ok(Arc::new(FanOut::new(sinks)))
}
