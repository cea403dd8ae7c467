//! Centralized validation for edgeranges.
//!
//! This module provides:
//! - CIDR entry validation (one `/`, digit-only prefix, family-bounded prefix length)
//! - Parsing of newline-delimited range bodies returned by the upstream
//! - Order-preserving exact-string deduplication
//! - Endpoint URL validation for configuration

use anyhow::{bail, Result};
use ipnet::IpNet;
use std::collections::HashSet;
use std::net::IpAddr;

use crate::family::{IpFamily, RangeList};

/// Validate a CIDR entry and return the parsed network.
///
/// The prefix bound follows the address type: 0-32 for IPv4, 0-128 for IPv6.
/// Host bits are allowed (`10.0.0.1/8` is accepted as written).
///
/// # Examples
/// ```
/// use edgeranges::validation::validate_cidr;
/// assert!(validate_cidr("173.245.48.0/20").is_ok());
/// assert!(validate_cidr("2606:4700::/32").is_ok());
/// assert!(validate_cidr("1.1.1.1").is_err());
/// assert!(validate_cidr("1.1.1.1/33").is_err());
/// assert!(validate_cidr("not-an-ip/99").is_err());
/// ```
pub fn validate_cidr(entry: &str) -> Result<IpNet> {
    let mut parts = entry.split('/');
    let (addr_part, prefix_part) = match (parts.next(), parts.next(), parts.next()) {
        (Some(addr), Some(prefix), None) => (addr, prefix),
        _ => bail!("Invalid CIDR '{}': expected exactly one '/'", entry),
    };

    // u8::from_str accepts a leading '+', so check the digits ourselves
    if prefix_part.is_empty() || !prefix_part.bytes().all(|b| b.is_ascii_digit()) {
        bail!(
            "Invalid CIDR '{}': prefix must be a non-negative integer",
            entry
        );
    }
    let prefix: u8 = prefix_part
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid CIDR '{}': prefix out of range", entry))?;

    let addr: IpAddr = addr_part
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid CIDR '{}': bad address '{}'", entry, addr_part))?;

    IpNet::new(addr, prefix).map_err(|_| {
        let max = if addr.is_ipv4() { 32 } else { 128 };
        anyhow::anyhow!("Invalid CIDR '{}': prefix {} exceeds {}", entry, prefix, max)
    })
}

/// Validate a CIDR entry and additionally require it to belong to `family`.
///
/// Used for statically configured fallback lists, where a mis-filed entry is a
/// configuration mistake rather than upstream noise.
pub fn validate_cidr_for(entry: &str, family: IpFamily) -> Result<IpNet> {
    let net = validate_cidr(entry)?;
    let matches = match family {
        IpFamily::V4 => matches!(net, IpNet::V4(_)),
        IpFamily::V6 => matches!(net, IpNet::V6(_)),
    };
    if !matches {
        bail!("CIDR '{}' is not an {} range", entry, family);
    }
    Ok(net)
}

/// A line dropped while parsing a range body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    pub line: String,
    pub reason: String,
}

/// Result of parsing one upstream response body.
#[derive(Debug, Default, Clone)]
pub struct ParsedRanges {
    pub ranges: RangeList,
    pub rejected: Vec<RejectedLine>,
}

/// Parse a newline-delimited list of CIDR entries.
///
/// Blank lines and `#` comments are skipped. Invalid entries are collected in
/// `rejected` and never abort the rest of the body.
pub fn parse_range_body(body: &str) -> ParsedRanges {
    let mut parsed = ParsedRanges::default();
    let mut seen = HashSet::new();

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match validate_cidr(trimmed) {
            Ok(_) => {
                if seen.insert(trimmed) {
                    parsed.ranges.push(trimmed.to_string());
                }
            }
            Err(e) => parsed.rejected.push(RejectedLine {
                line: trimmed.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    parsed
}

/// Remove exact-string duplicates, keeping the first occurrence.
///
/// # Examples
/// ```
/// use edgeranges::validation::dedupe;
/// let merged = dedupe(["a/1", "b/2", "a/1"].iter().map(|s| s.to_string()));
/// assert_eq!(merged, vec!["a/1", "b/2"]);
/// ```
pub fn dedupe<I>(entries: I) -> RangeList
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.clone()))
        .collect()
}

/// Merged view of both families: IPv4 entries first, then IPv6, deduplicated.
pub fn merge_families(ipv4: &[String], ipv6: &[String]) -> RangeList {
    dedupe(ipv4.iter().chain(ipv6.iter()).cloned())
}

/// Validate an upstream endpoint URL (http or https, with a host).
pub fn validate_endpoint(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        bail!("Endpoint URL cannot be empty");
    }
    let parsed =
        reqwest::Url::parse(url).map_err(|e| anyhow::anyhow!("Invalid URL '{}': {}", url, e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Endpoint '{}' must use http or https", url);
    }
    if parsed.host_str().is_none() {
        bail!("Endpoint '{}' has no host", url);
    }
    Ok(())
}
