//! Clear command implementation.

use anyhow::Result;

use crate::cli::ClearArgs;
use crate::engine::{ClearTarget, Engine};

/// Pick the tiers to clear; no flag means both
pub fn target(args: ClearArgs) -> ClearTarget {
    match (args.current, args.last_good) {
        (true, false) => ClearTarget::Current,
        (false, true) => ClearTarget::LastGood,
        _ => ClearTarget::Both,
    }
}

/// Run the clear command
pub async fn run(args: ClearArgs, engine: &Engine) -> Result<()> {
    let target = target(args);

    let cleared = engine.clear(target)?;

    for tier in target.tiers() {
        println!("Cleared {} cache keys.", tier);
    }
    println!("Total keys cleared: {}", cleared.len());

    Ok(())
}
