//! HTTP fetcher for upstream IP range lists.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Endpoints, HttpConfig, LoggingConfig, RetryConfig};
use crate::error::RangeError;
use crate::family::{IpFamily, RangeList};
use crate::validation::parse_range_body;

#[cfg(test)]
use mockall::automock;

/// Maximum accepted response body (1 MB).
/// Published edge range lists are a few hundred bytes.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Source of range lists for one address family.
///
/// Implementations never fail: any transport or HTTP error yields an empty list.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RangeSource: Send + Sync {
    async fn fetch(&self, family: IpFamily) -> RangeList;
}

/// HTTP client fetching the configured endpoints
pub struct Fetcher {
    client: Client,
    endpoints: Endpoints,
    retry: RetryConfig,
    log_failures: bool,
}

impl Fetcher {
    /// Create a fetcher from HTTP and logging settings
    pub fn new(http: &HttpConfig, logging: &LoggingConfig) -> std::result::Result<Self, RangeError> {
        let client = Client::builder()
            .timeout(http.timeout_duration())
            .user_agent(http.user_agent.clone())
            .build()
            .map_err(|e| RangeError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoints: http.endpoints.clone(),
            retry: http.retry.clone(),
            log_failures: logging.failed_fetch,
        })
    }

    /// Fetch content, retrying failed attempts after a fixed delay
    async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        let mut last_error = None;
        let attempts = self.retry.attempts.max(1);

        for attempt in 0..attempts {
            if attempt > 0 {
                debug!("Retry {} after {}ms for {}", attempt, self.retry.delay_ms, url);
                tokio::time::sleep(Duration::from_millis(self.retry.delay_ms)).await;
            }

            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    debug!("Attempt {} for {} failed: {:#}", attempt + 1, url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown error")))
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {}", status);
        }

        if let Some(content_length) = response.content_length() {
            if content_length as usize > MAX_BODY_SIZE {
                anyhow::bail!(
                    "Response too large: {} bytes (max: {} bytes)",
                    content_length,
                    MAX_BODY_SIZE
                );
            }
        }

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if body.len() > MAX_BODY_SIZE {
            anyhow::bail!(
                "Downloaded content too large: {} bytes (max: {} bytes)",
                body.len(),
                MAX_BODY_SIZE
            );
        }

        Ok(body)
    }
}

#[async_trait]
impl RangeSource for Fetcher {
    async fn fetch(&self, family: IpFamily) -> RangeList {
        let url = self.endpoints.for_family(family);
        debug!("Fetching {} ranges from {}", family, url);

        let body = match self.fetch_with_retry(url).await {
            Ok(body) => body,
            Err(e) => {
                if self.log_failures {
                    warn!("Failed to fetch {} ranges from {}: {:#}", family, url, e);
                } else {
                    debug!("Failed to fetch {} ranges from {}: {:#}", family, url, e);
                }
                return RangeList::new();
            }
        };

        let parsed = parse_range_body(&body);
        for rejected in &parsed.rejected {
            warn!(
                "Dropping invalid {} entry '{}': {}",
                family, rejected.line, rejected.reason
            );
        }

        info!("Fetched {} - {} ranges", family, parsed.ranges.len());
        parsed.ranges
    }
}

// Note: Default is intentionally not implemented for Fetcher
// because new() can fail and we want explicit error handling.

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn http_config(server: &MockServer, attempts: u32) -> HttpConfig {
        HttpConfig {
            timeout: 5,
            retry: RetryConfig {
                attempts,
                delay_ms: 1,
            },
            user_agent: "edgeranges-test/1.0".to_string(),
            endpoints: Endpoints {
                ipv4: format!("{}/ips-v4", server.uri()),
                ipv6: format!("{}/ips-v6", server.uri()),
            },
        }
    }

    fn fetcher(server: &MockServer, attempts: u32) -> Fetcher {
        Fetcher::new(&http_config(server, attempts), &LoggingConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_parses_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ips-v4"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1.1.1.1/32\n10.0.0.0/8\n"))
            .mount(&server)
            .await;

        let ranges = fetcher(&server, 1).fetch(IpFamily::V4).await;
        assert_eq!(ranges, vec!["1.1.1.1/32", "10.0.0.0/8"]);
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ips-v6"))
            .and(header("user-agent", "edgeranges-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("2606:4700::/32"))
            .expect(1)
            .mount(&server)
            .await;

        let ranges = fetcher(&server, 1).fetch(IpFamily::V6).await;
        assert_eq!(ranges, vec!["2606:4700::/32"]);
    }

    #[tokio::test]
    async fn test_fetch_server_error_returns_empty_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ips-v4"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let ranges = fetcher(&server, 3).fetch(IpFamily::V4).await;
        assert!(ranges.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_recovers_on_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ips-v4"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ips-v4"))
            .respond_with(ResponseTemplate::new(200).set_body_string("173.245.48.0/20"))
            .mount(&server)
            .await;

        let ranges = fetcher(&server, 3).fetch(IpFamily::V4).await;
        assert_eq!(ranges, vec!["173.245.48.0/20"]);
    }

    #[tokio::test]
    async fn test_fetch_drops_malformed_lines() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ips-v4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("# list\n1.1.1.1/32\nnot-an-ip/99\n10.0.0.0/8\n"),
            )
            .mount(&server)
            .await;

        let ranges = fetcher(&server, 1).fetch(IpFamily::V4).await;
        assert_eq!(ranges, vec!["1.1.1.1/32", "10.0.0.0/8"]);
    }

    #[tokio::test]
    async fn test_fetch_oversized_body_is_failure() {
        let server = MockServer::start().await;
        let body = "10.0.0.0/8\n".repeat(MAX_BODY_SIZE / 10);
        Mock::given(method("GET"))
            .and(path("/ips-v4"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let ranges = fetcher(&server, 1).fetch(IpFamily::V4).await;
        assert!(ranges.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_returns_empty() {
        let config = HttpConfig {
            timeout: 1,
            retry: RetryConfig {
                attempts: 1,
                delay_ms: 1,
            },
            endpoints: Endpoints {
                ipv4: "http://127.0.0.1:9/ips-v4".to_string(),
                ipv6: "http://127.0.0.1:9/ips-v6".to_string(),
            },
            ..HttpConfig::default()
        };
        let fetcher = Fetcher::new(&config, &LoggingConfig { failed_fetch: false }).unwrap();
        assert!(fetcher.fetch(IpFamily::V6).await.is_empty());
    }
}
