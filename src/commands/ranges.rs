//! Ranges command implementation.

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::engine::Engine;
use crate::family::RangeKind;

#[derive(Serialize)]
struct RangesOutput<'a> {
    kind: RangeKind,
    source: &'static str,
    ranges: &'a [String],
}

/// Print the resolved list, one range per line
pub async fn run(kind: RangeKind, json: bool, engine: &Engine) -> Result<()> {
    let resolution = engine.resolver().resolve_traced(kind).await?;

    info!(
        "{} ranges for {} from {}",
        resolution.ranges.len(),
        kind,
        resolution.provenance.as_str()
    );

    if json {
        let output = RangesOutput {
            kind,
            source: resolution.provenance.as_str(),
            ranges: &resolution.ranges,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for range in &resolution.ranges {
            println!("{}", range);
        }
    }

    Ok(())
}
