//! Address families, read selectors and cache tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered list of CIDR strings without exact duplicates.
pub type RangeList = Vec<String>;

/// Address space fetched from one upstream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    pub const BOTH: [IpFamily; 2] = [IpFamily::V4, IpFamily::V6];

    /// Largest prefix length valid for this family
    pub fn max_prefix(self) -> u8 {
        match self {
            IpFamily::V4 => 32,
            IpFamily::V6 => 128,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IpFamily::V4 => "ipv4",
            IpFamily::V6 => "ipv6",
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a caller reads: one family, or the merged view of both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    #[value(name = "v4", alias = "ipv4")]
    V4,
    #[value(name = "v6", alias = "ipv6")]
    V6,
    #[value(name = "all")]
    All,
}

impl RangeKind {
    pub const ALL_KINDS: [RangeKind; 3] = [RangeKind::V4, RangeKind::V6, RangeKind::All];

    pub fn as_str(self) -> &'static str {
        match self {
            RangeKind::V4 => "ipv4",
            RangeKind::V6 => "ipv6",
            RangeKind::All => "all",
        }
    }

    /// Short label used in key maps and reports (v4, v6, all)
    pub fn label(self) -> &'static str {
        match self {
            RangeKind::V4 => "v4",
            RangeKind::V6 => "v6",
            RangeKind::All => "all",
        }
    }
}

impl From<IpFamily> for RangeKind {
    fn from(family: IpFamily) -> Self {
        match family {
            IpFamily::V4 => RangeKind::V4,
            IpFamily::V6 => RangeKind::V6,
        }
    }
}

impl fmt::Display for RangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted snapshot a range list lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Expires after the configured TTL
    Current,
    /// Never expires; only a successful refresh overwrites it
    LastGood,
}

impl Tier {
    pub const BOTH: [Tier; 2] = [Tier::Current, Tier::LastGood];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Current => "current",
            Tier::LastGood => "last_good",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a resolved list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Current,
    LastGood,
    Fallback,
    Empty,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Current => "current",
            Provenance::LastGood => "last_good",
            Provenance::Fallback => "fallback",
            Provenance::Empty => "empty",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_prefix() {
        assert_eq!(IpFamily::V4.max_prefix(), 32);
        assert_eq!(IpFamily::V6.max_prefix(), 128);
    }

    #[test]
    fn test_kind_from_family() {
        assert_eq!(RangeKind::from(IpFamily::V4), RangeKind::V4);
        assert_eq!(RangeKind::from(IpFamily::V6), RangeKind::V6);
    }

    #[test]
    fn test_display() {
        assert_eq!(RangeKind::All.to_string(), "all");
        assert_eq!(Tier::LastGood.to_string(), "last_good");
        assert_eq!(IpFamily::V6.to_string(), "ipv6");
    }
}
