//! Configuration management for edgeranges.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::family::{IpFamily, RangeKind, Tier};
use crate::validation::{validate_cidr_for, validate_endpoint};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/edgeranges/config.yaml";

/// Default TTL for the `current` tier (24 hours)
const DEFAULT_TTL_SECS: u64 = 60 * 60 * 24;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache store selection, keys and resolution policy
    pub cache: CacheConfig,

    /// Upstream HTTP settings
    pub http: HttpConfig,

    /// Logging toggles
    pub logging: LoggingConfig,

    /// Opportunistic refresh on cold reads
    pub auto_fetch: AutoFetchConfig,

    /// Static ranges used when both cache tiers are empty
    pub fallback: FallbackConfig,

    /// External event delivery
    pub events: EventsConfig,
}

impl Config {
    /// Load configuration from a YAML file, apply environment overrides and validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }

        debug!(
            "Config file {:?} not found, using defaults",
            path.as_ref()
        );
        let mut config = Config::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `EDGERANGES_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("EDGERANGES_CACHE_STORE") {
            self.cache.store = match val.trim() {
                "memory" => StoreKind::Memory,
                "file" => StoreKind::File,
                other => anyhow::bail!(
                    "Invalid EDGERANGES_CACHE_STORE '{}'. Valid values: memory, file",
                    other
                ),
            };
        }

        if let Some(val) = lookup("EDGERANGES_CACHE_TTL") {
            self.cache.ttl = parse_ttl(&val).map_err(|e| anyhow::anyhow!(e))?;
        }

        if let Some(val) = lookup("EDGERANGES_HTTP_TIMEOUT") {
            self.http.timeout = val
                .trim()
                .parse()
                .with_context(|| format!("Invalid EDGERANGES_HTTP_TIMEOUT '{}'", val))?;
        }

        if let Some(val) = lookup("EDGERANGES_HTTP_USER_AGENT") {
            self.http.user_agent = val;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        validate_endpoint(&self.http.endpoints.ipv4).context("Invalid http.endpoints.ipv4")?;
        validate_endpoint(&self.http.endpoints.ipv6).context("Invalid http.endpoints.ipv6")?;

        if self.http.timeout == 0 {
            anyhow::bail!("http.timeout must be at least 1 second");
        }

        if self.http.retry.attempts == 0 {
            anyhow::bail!("http.retry.attempts must be at least 1");
        }

        if self.http.user_agent.contains('\r') || self.http.user_agent.contains('\n') {
            anyhow::bail!("http.user_agent contains newline characters");
        }

        // Segment keys and the rate-limit marker must not alias each other
        let mut seen = HashSet::new();
        let all_keys = self
            .cache
            .keys
            .iter()
            .map(|(tier, kind, key)| (format!("cache.keys.{}.{}", tier, kind.label()), key))
            .chain(std::iter::once((
                "auto_fetch.key".to_string(),
                self.auto_fetch.key.as_str(),
            )));
        for (name, key) in all_keys {
            if key.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
            if !seen.insert(key) {
                anyhow::bail!("{} duplicates another cache key: '{}'", name, key);
            }
        }

        for family in IpFamily::BOTH {
            for entry in self.fallback.for_family(family) {
                validate_cidr_for(entry, family)
                    .with_context(|| format!("Invalid fallback.{} entry", family))?;
            }
        }

        if let Some(ref url) = self.events.webhook_url {
            if !url.starts_with("https://") {
                anyhow::bail!("Webhook URL must use HTTPS: {}", url);
            }
        }

        Ok(())
    }
}

/// Which cache store backs the tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-local; contents vanish on exit
    Memory,
    /// JSON document on disk
    #[default]
    File,
}

impl StoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::File => "file",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub store: StoreKind,

    /// Location of the file store
    pub path: PathBuf,

    /// TTL in seconds for the `current` tier; `None` stores forever
    #[serde(deserialize_with = "deserialize_ttl")]
    pub ttl: Option<u64>,

    /// Serve `last_good` when `current` has expired
    pub allow_stale: bool,

    /// Fail with an error instead of returning an empty list
    pub throw_on_empty: bool,

    pub keys: CacheKeys,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::File,
            path: PathBuf::from("/var/lib/edgeranges/cache.json"),
            ttl: Some(DEFAULT_TTL_SECS),
            allow_stale: true,
            throw_on_empty: false,
            keys: CacheKeys::default(),
        }
    }
}

impl CacheConfig {
    pub fn ttl_duration(&self) -> Option<Duration> {
        self.ttl.map(Duration::from_secs)
    }
}

/// Cache keys for both tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheKeys {
    pub current: TierKeys,
    pub last_good: TierKeys,
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self {
            current: TierKeys {
                v4: "edgeranges:ips:v4:current".to_string(),
                v6: "edgeranges:ips:v6:current".to_string(),
                all: "edgeranges:ips:current".to_string(),
            },
            last_good: TierKeys {
                v4: "edgeranges:ips:v4:last_good".to_string(),
                v6: "edgeranges:ips:v6:last_good".to_string(),
                all: "edgeranges:ips:last_good".to_string(),
            },
        }
    }
}

impl CacheKeys {
    /// Key of one segment
    pub fn key(&self, tier: Tier, kind: RangeKind) -> &str {
        let keys = match tier {
            Tier::Current => &self.current,
            Tier::LastGood => &self.last_good,
        };
        match kind {
            RangeKind::V4 => &keys.v4,
            RangeKind::V6 => &keys.v6,
            RangeKind::All => &keys.all,
        }
    }

    /// All six segments as (tier, kind, key)
    pub fn iter(&self) -> impl Iterator<Item = (Tier, RangeKind, &str)> + '_ {
        Tier::BOTH.into_iter().flat_map(move |tier| {
            RangeKind::ALL_KINDS
                .into_iter()
                .map(move |kind| (tier, kind, self.key(tier, kind)))
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TierKeys {
    pub v4: String,
    pub v6: String,
    pub all: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout: u64,
    pub retry: RetryConfig,
    pub user_agent: String,
    pub endpoints: Endpoints,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: 10,
            retry: RetryConfig::default(),
            user_agent: format!("edgeranges/{}", env!("CARGO_PKG_VERSION")),
            endpoints: Endpoints::default(),
        }
    }
}

impl HttpConfig {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, including the first
    pub attempts: u32,
    /// Pause between attempts in milliseconds
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub ipv4: String,
    pub ipv6: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            ipv4: "https://www.cloudflare.com/ips-v4".to_string(),
            ipv6: "https://www.cloudflare.com/ips-v6".to_string(),
        }
    }
}

impl Endpoints {
    pub fn for_family(&self, family: IpFamily) -> &str {
        match family {
            IpFamily::V4 => &self.ipv4,
            IpFamily::V6 => &self.ipv6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log a warning when an upstream fetch fails
    pub failed_fetch: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { failed_fetch: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoFetchConfig {
    pub enabled: bool,
    /// Cooldown between attempts in seconds
    pub rate_limit: u64,
    /// Cache key of the last-attempt marker
    pub key: String,
}

impl Default for AutoFetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_limit: 300,
            key: "edgeranges:auto_fetch:last_attempt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
}

impl FallbackConfig {
    pub fn for_family(&self, family: IpFamily) -> &[String] {
        match family {
            IpFamily::V4 => &self.ipv4,
            IpFamily::V6 => &self.ipv6,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// HTTPS endpoint receiving each event as JSON
    pub webhook_url: Option<String>,
}

/// Parse a TTL given as seconds or "forever"
fn parse_ttl(value: &str) -> std::result::Result<Option<u64>, String> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("forever") || value.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    value
        .parse::<u64>()
        .map(Some)
        .map_err(|_| format!("Invalid TTL '{}'. Use a number of seconds or 'forever'", value))
}

/// Accept `ttl: 3600`, `ttl: "3600"`, `ttl: forever` and `ttl: null`
fn deserialize_ttl<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTtl {
        Seconds(u64),
        Text(String),
    }

    match Option::<RawTtl>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawTtl::Seconds(secs)) => Ok(Some(secs)),
        Some(RawTtl::Text(text)) => parse_ttl(&text).map_err(serde::de::Error::custom),
    }
}
