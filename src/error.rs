//! Typed errors at the crate's interface boundaries.
//!
//! Operational flow (per-pass MM/ST/hedger loops) uses `anyhow::Result` and
//! logs-and-continues; these types are for the seams other crates or tests
//! would match on (venue responses, config loading, cache access).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("venue request failed: {0}")]
    Request(String),

    #[error("venue rejected order: {0}")]
    Rejected(String),

    #[error("venue response missing required field `{0}`")]
    MissingField(&'static str),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(String),
}
