//! CLI command implementations.

pub mod cache_info;
pub mod clear;
pub mod ranges;
pub mod refresh;

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::engine::Engine;

/// Load configuration (defaults when the file is missing) and wire the engine
pub fn load_engine(config_path: &Path) -> Result<Engine> {
    let config = Config::load_or_default(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    Engine::from_config(&config).context("Failed to initialize engine")
}
