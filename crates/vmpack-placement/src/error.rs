//! Error types for the vmpack placement engine.

use thiserror::Error;

/// Result type alias for fallible placement operations.
pub type PlacementResult<T> = Result<T, PlacementError>;

/// Errors raised for malformed requests or configuration.
///
/// Capacity shortfalls are not errors: an unplaceable VM lands in the
/// failure set of the outcome and the run continues.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("vm {vm} is listed on more than one previous host ({first}, {second})")]
    DuplicatePlacement {
        vm: String,
        first: String,
        second: String,
    },

    #[error("unknown vm referenced in {context}: {vm}")]
    UnknownVm { vm: String, context: &'static str },

    #[error("unknown host referenced in {context}: {host}")]
    UnknownHost { host: String, context: &'static str },

    #[error("vm {0} is both added and removed by the diff")]
    ConflictingDiff(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid request: {0}")]
    Request(#[from] serde_json::Error),
}
