//! edgeranges - Edge Network IP Range Keeper
//!
//! Keeps the published edge network IP ranges cached so request handlers can
//! tell proxies from clients without touching the network.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use edgeranges::cli::{Cli, Commands};
use edgeranges::commands;

/// Upper bound on waiting for webhook deliveries before exit
const EVENT_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Version = cli.command {
        println!("edgeranges {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    let engine = commands::load_engine(&cli.config)?;

    let outcome = match cli.command {
        Commands::Refresh { deadline } => commands::refresh::run(deadline, &engine)
            .await
            .map(|success| {
                if success {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }),
        Commands::CacheInfo { json } => commands::cache_info::run(json, &engine)
            .await
            .map(|_| ExitCode::SUCCESS),
        Commands::Clear(args) => commands::clear::run(args, &engine)
            .await
            .map(|_| ExitCode::SUCCESS),
        Commands::Ranges { kind, json } => commands::ranges::run(kind, json, &engine)
            .await
            .map(|_| ExitCode::SUCCESS),
        Commands::Version => Ok(ExitCode::SUCCESS),
    };

    // Deliveries spawned during the command die with the runtime otherwise
    engine.flush_events(EVENT_FLUSH_TIMEOUT).await;

    outcome
}
