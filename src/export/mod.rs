pub mod error;
pub mod series_export;
