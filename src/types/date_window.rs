//! The request window submitted to the provider as one API call.

use crate::types::month::Month;
use chrono::{Datelike, Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// An inclusive `[start, end]` time range, normally one calendar month
/// (day 1 00:00:00 through the last day 23:00:00).
///
/// Windows are produced by [`crate::monthly_windows`] and are immutable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DateWindow {
    /// Returns `None` when `end < start`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        if end < start {
            return None;
        }
        Some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Calendar month of the window start.
    pub fn month(&self) -> Month {
        Month(self.start.year(), self.start.month())
    }

    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.start <= time && time <= self.end
    }

    /// Number of hourly instants in `[start, end]`.
    pub fn hour_count(&self) -> usize {
        ((self.end - self.start).num_hours() + 1) as usize
    }

    /// Every hourly instant from `start` up to and including `end`.
    pub fn hours(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        let start = self.start;
        (0..self.hour_count() as i64).map(move |h| start + Duration::hours(h))
    }
}

impl Display for DateWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} .. {}]",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_hours() {
        let month = Month(2024, 2);
        let window = DateWindow::new(month.first_instant().unwrap(), month.last_hour().unwrap())
            .unwrap();
        assert_eq!(window.hour_count(), 29 * 24);
        assert_eq!(window.hours().count(), 29 * 24);
        assert_eq!(window.hours().last(), Some(window.end()));
        assert_eq!(window.month(), month);
        assert_eq!(
            window.to_string(),
            "[2024-02-01 00:00:00 .. 2024-02-29 23:00:00]"
        );
    }

    #[test]
    fn test_rejects_reversed_bounds() {
        let month = Month(2024, 2);
        assert!(DateWindow::new(month.last_hour().unwrap(), month.first_instant().unwrap()).is_none());
    }
}
