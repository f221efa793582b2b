use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Required column '{0}' not found in DataFrame")]
    ColumnNotFound(String, #[source] PolarsError),

    #[error("Column '{column}' could not be read as {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
        #[source]
        source: PolarsError,
    },

    #[error("Unsupported dtype {dtype} for the time column")]
    UnsupportedTimeType { dtype: String },

    #[error("Unparsable timestamp '{0}'")]
    InvalidTime(String),

    #[error("Row {row} has a null time or coordinate")]
    NullCoordinate { row: usize },

    #[error("Feature vector has {found} values, dataset has {expected} features")]
    FeatureCountMismatch { expected: usize, found: usize },
}
