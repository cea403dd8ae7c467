//! Error types for edgeranges.

use thiserror::Error;

use crate::RangeKind;

#[derive(Error, Debug)]
pub enum RangeError {
    #[error("No IP range list available for {kind} (both current and last_good empty)")]
    EmptyCache { kind: RangeKind },

    #[error("Cache store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, RangeError>;
