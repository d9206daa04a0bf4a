//! Engine-wide error taxonomy

use thiserror::Error;

/// Errors surfaced by the grid engine.
///
/// Only `InvalidConfig` (at startup) escapes the orchestrator; everything
/// else is absorbed per sync cycle so a transient failure never stops
/// trading.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed exchange response: {0}")]
    Parse(String),

    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;
