//! Refresh command implementation.

use anyhow::Result;
use std::time::Duration;
use tracing::info;

use crate::engine::Engine;

/// Run the refresh command. Returns whether the refresh committed.
pub async fn run(deadline: Option<u64>, engine: &Engine) -> Result<bool> {
    info!("Refreshing IP ranges...");
    let success = match deadline {
        Some(secs) => engine.refresh_within(Duration::from_secs(secs)).await?,
        None => engine.refresh().await?,
    };

    if success {
        println!("[OK] IP ranges refreshed successfully.");
    } else {
        eprintln!("[FAIL] Failed to refresh IP ranges. Using cached or fallback data.");
    }

    // Fresh unit of work so the counts reflect what readers now get
    let mut resolver = engine.resolver();
    let v4 = resolver.ipv4().await.unwrap_or_default();
    let v6 = resolver.ipv6().await.unwrap_or_default();
    let all = resolver.all().await.unwrap_or_default();

    println!("IPv4 (current or fallback): {}", v4.len());
    println!("IPv6 (current or fallback): {}", v6.len());
    println!("All (current or fallback): {}", all.len());

    Ok(success)
}
