use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to encode or decode split JSON '{0}'")]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("Failed to build or write DataFrame")]
    Polars(#[from] PolarsError),

    #[error("Malformed split JSON: {0}")]
    MalformedSplit(String),

    #[error("Timestamp {0} ms is out of range")]
    InvalidTime(i64),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
