use crate::types::location::Axis;
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("Cannot search an empty grid axis")]
    EmptyAxis,

    #[error("Target coordinate {0} is not a finite number")]
    NonFiniteTarget(f64),
}

#[derive(Debug, Error, PartialEq)]
pub enum ResolutionError {
    #[error("Failed to resolve the {axis} of location '{location}'")]
    Grid {
        location: String,
        axis: Axis,
        #[source]
        source: GridError,
    },

    #[error("Resolved {axis} {value} of location '{location}' is not present in the provider grid")]
    AxisValueMissing {
        location: String,
        axis: Axis,
        value: f64,
    },

    #[error("Grid point of location '{location}' has no {axis} entry at {time}")]
    GridPointMissing {
        location: String,
        axis: Axis,
        time: NaiveDateTime,
    },

    #[error("Location registry has already been resolved against a grid")]
    AlreadyResolved,

    #[error("Location '{0}' has not been resolved to a grid point")]
    Unresolved(String),
}
