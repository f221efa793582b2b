use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Location registry is empty")]
    Empty,

    #[error("Duplicate location name '{0}'")]
    DuplicateName(String),

    #[error("Location '{0}' has a non-finite coordinate")]
    InvalidCoordinate(String),

    #[error("Failed to read registry CSV '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("Required column '{0}' not found in registry")]
    MissingColumn(String, #[source] PolarsError),

    #[error("Registry column '{column}' has an unexpected type")]
    ColumnType {
        column: String,
        #[source]
        source: PolarsError,
    },

    #[error("Row {row} of the registry has no value for '{column}'")]
    MissingValue { row: usize, column: String },
}
