//! # edgeranges - Edge Network IP Range Keeper
//!
//! Maintains the list of IP ranges published by an edge network (Cloudflare by
//! default) so a host application can tell edge hops from genuine clients, for
//! example when populating a reverse-proxy trust list. Readers always get *some*
//! answer: fresh, stale, or statically configured, never an unexplained empty list.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        edgeranges                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: refresh, cache-info, clear, ranges         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Engine                                                     │
//! │    ├── Resolver: current → last_good → fallback → empty     │
//! │    ├── Refresh: fetch both, commit all-or-nothing           │
//! │    └── Auto-fetch guard: cold reads, cooldown marker        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Fetcher (reqwest + rustls)     │  Store (memory, file)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Events (tracing log, webhook)                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use edgeranges::config::Config;
//! use edgeranges::engine::Engine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("/etc/edgeranges/config.yaml")?;
//!     let engine = Engine::from_config(&config)?;
//!
//!     // One resolver per request: repeated reads are memoized
//!     let mut resolver = engine.resolver();
//!     let trusted = resolver.all().await?;
//!     println!("{} trusted ranges", trusted.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`diagnostics`] - Read-only cache report
//! - [`engine`] - Resolution chain, refresh and auto-fetch
//! - [`events`] - Event sinks (log, webhook, memory)
//! - [`fetcher`] - HTTP client for the upstream range lists
//! - [`store`] - Cache store trait and adapters
//! - [`utils`] - Formatting helpers
//! - [`validation`] - CIDR validation and list parsing

pub mod cli;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod events;
pub mod family;
pub mod fetcher;
pub mod store;
pub mod utils;
pub mod validation;

pub use config::Config;
pub use engine::{Engine, Resolver};
pub use error::RangeError;
pub use family::{IpFamily, Provenance, RangeKind, RangeList, Tier};
