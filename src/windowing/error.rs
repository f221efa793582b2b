use crate::types::month::Month;
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowingError {
    #[error("The end date {end} must be after the start date {start}")]
    EndBeforeStart {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Shifting {time} by {months} months leaves the supported date range")]
    DateOutOfRange { time: NaiveDateTime, months: i64 },

    #[error("Month {0} has no valid calendar bounds")]
    InvalidMonth(Month),
}
