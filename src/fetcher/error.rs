use crate::dataset::error::DatasetError;
use crate::types::date_window::DateWindow;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Provider rejected window {window}: {message}")]
    Provider { window: DateWindow, message: String },

    #[error("No base URL configured for the window endpoint")]
    MissingBaseUrl,

    #[error("Failed to resolve cache directory")]
    CacheDirResolution(#[source] std::io::Error),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read cache file '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write cache file '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode cache data from '{0}'")]
    CacheDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode cache data")]
    CacheEncode(#[source] Box<bincode::error::EncodeError>),

    #[error("Failed to read fetcher config '{0}'")]
    ConfigRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse fetcher config '{0}'")]
    ConfigParse(PathBuf, #[source] serde_json::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Data download or decompression failed")]
    DownloadIo(#[from] std::io::Error),

    #[error("I/O error processing CSV data for window {window}")]
    CsvReadIo {
        window: DateWindow,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing error processing CSV data for window {window}")]
    CsvReadPolars {
        window: DateWindow,
        #[source]
        source: PolarsError,
    },

    #[error("Malformed dataset for window {window}")]
    Dataset {
        window: DateWindow,
        #[source]
        source: DatasetError,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
