use crate::grid::error::ResolutionError;
use crate::types::date_window::DateWindow;
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CompletenessError {
    #[error("Window {window} produced data for {found} locations, expected {expected}")]
    IncompleteWindow {
        window: DateWindow,
        expected: usize,
        found: usize,
    },

    #[error("Series of '{location}' is missing {missing} hours, first at {first_missing}")]
    MissingHours {
        location: String,
        missing: usize,
        first_missing: NaiveDateTime,
    },

    #[error("Frame for '{location}' starts at {time}, not after the series end {last}")]
    OutOfOrder {
        location: String,
        time: NaiveDateTime,
        last: NaiveDateTime,
    },

    #[error("Window {window} has features {found:?}, expected {expected:?}")]
    FeatureMismatch {
        window: DateWindow,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum AssemblyError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Completeness(#[from] CompletenessError),
}
