//! Cache-info command implementation.

use anyhow::Result;
use chrono::Utc;

use crate::diagnostics::{CacheInfo, SegmentInfo, TierInfo};
use crate::engine::Engine;
use crate::family::{RangeKind, Tier};
use crate::utils::{format_duration_ago, format_ttl, truncate};

const KEY_WIDTH: usize = 40;

/// Run the cache-info command
pub async fn run(json: bool, engine: &Engine) -> Result<()> {
    let info = engine.report();

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", render(&info));
    }

    Ok(())
}

/// Human-readable report
pub fn render(info: &CacheInfo) -> String {
    let mut out = String::new();

    out.push_str("\nCache configuration\n");
    out.push_str(&format!("  Store:       {}\n", info.store));
    out.push_str(&format!("  TTL:         {}\n", format_ttl(info.configured_ttl)));
    out.push_str(&format!("  Allow stale: {}\n", yes_no(info.allow_stale)));

    for tier in Tier::BOTH {
        out.push_str(&format!("\n{} tier\n", tier));
        out.push_str(&render_tier(info.segments.tier(tier)));
    }

    out.push_str("\nFallback ranges (config)\n");
    out.push_str(&format!("  IPv4: {}\n", info.fallback.ipv4_count));
    out.push_str(&format!("  IPv6: {}\n", info.fallback.ipv6_count));

    let auto = &info.auto_fetch;
    out.push_str("\nAuto-fetch\n");
    out.push_str(&format!("  Enabled:      {}\n", yes_no(auto.enabled)));
    out.push_str(&format!("  Cooldown:     {}s\n", auto.rate_limit));
    out.push_str(&format!(
        "  Rate limited: {}\n",
        yes_no(auto.currently_rate_limited)
    ));
    let last = auto
        .last_attempt
        .map(|at| format!("{} ({})", at.to_rfc3339(), format_duration_ago(at, Utc::now())))
        .unwrap_or_else(|| "never".to_string());
    out.push_str(&format!("  Last attempt: {}\n", last));

    out
}

fn render_tier(tier: &TierInfo) -> String {
    RangeKind::ALL_KINDS
        .iter()
        .map(|&kind| render_segment(kind, tier.segment(kind)))
        .collect()
}

fn render_segment(kind: RangeKind, segment: &SegmentInfo) -> String {
    let status = if segment.present { "cached" } else { "missing" };
    format!(
        "  {:<4} {:<width$} status: {:<8} count: {}\n",
        kind.label(),
        truncate(&segment.key, KEY_WIDTH),
        status,
        segment.count,
        width = KEY_WIDTH
    )
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
