//! CLI argument parsing with clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;
use crate::family::RangeKind;

#[derive(Parser)]
#[command(name = "edgeranges")]
#[command(author, version, about = "Edge network IP range keeper")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Quiet mode (for cron/systemd timer)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and cache the latest IPv4/IPv6 ranges
    Refresh {
        /// Give up fetching after this many seconds
        #[arg(long)]
        deadline: Option<u64>,
    },

    /// Show what the cache holds (no network access)
    CacheInfo {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Clear cached ranges (both tiers unless one is selected)
    Clear(ClearArgs),

    /// Print the resolved ranges
    Ranges {
        /// Which list to print (v4, v6, all)
        #[arg(value_enum, default_value = "all")]
        kind: RangeKind,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version
    Version,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ClearArgs {
    /// Clear only the current tier
    #[arg(long, conflicts_with = "last_good")]
    pub current: bool,

    /// Clear only the last_good tier
    #[arg(long = "last-good")]
    pub last_good: bool,
}
