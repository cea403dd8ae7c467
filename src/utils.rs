//! Formatting helpers shared by the CLI commands.
//!
//! - [`format_ttl`] - TTL seconds or "forever"
//! - [`format_duration_ago`] - Relative age of a timestamp (5m ago, 2h ago)
//! - [`truncate`] - Truncate strings with ellipsis

use chrono::{DateTime, Utc};

/// Format a configured TTL.
///
/// # Examples
/// ```
/// use edgeranges::utils::format_ttl;
/// assert_eq!(format_ttl(None), "forever");
/// assert_eq!(format_ttl(Some(86400)), "86400s");
/// ```
pub fn format_ttl(ttl: Option<u64>) -> String {
    match ttl {
        Some(secs) => format!("{}s", secs),
        None => "forever".to_string(),
    }
}

/// Format the time elapsed since `dt`, relative to `now`.
pub fn format_duration_ago(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(dt).num_seconds();
    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h ago", seconds / 3600)
    } else {
        format!("{}d ago", seconds / 86400)
    }
}

/// Truncate a string to a maximum length, adding "..." if truncated.
///
/// # Examples
/// ```
/// use edgeranges::utils::truncate;
/// assert_eq!(truncate("short", 10), "short");
/// assert_eq!(truncate("this is long", 10), "this is...");
/// ```
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_ttl() {
        assert_eq!(format_ttl(Some(0)), "0s");
        assert_eq!(format_ttl(Some(3600)), "3600s");
        assert_eq!(format_ttl(None), "forever");
    }

    #[test]
    fn test_format_duration_ago() {
        let now = Utc::now();
        assert_eq!(format_duration_ago(now, now), "just now");
        assert_eq!(format_duration_ago(now - Duration::seconds(59), now), "just now");
        assert_eq!(format_duration_ago(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(format_duration_ago(now - Duration::hours(3), now), "3h ago");
        assert_eq!(format_duration_ago(now - Duration::days(2), now), "2d ago");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("test", 3), "...");
    }
}
