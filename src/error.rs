use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a run before the first request is issued.
///
/// Anything that goes wrong with an individual request is a failed check,
/// not a `LoadError`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid target url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid duration '{0}': use seconds or a duration like '30s', '5m', '1m30s'")]
    InvalidDuration(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LoadError>;
