//! Splits a request range into calendar-aligned monthly windows.
//!
//! The provider caps the size of a single request, so a multi-year range is fetched one month at a
//! time. Window 0 covers only the start month and is used to resolve grid coordinates before the
//! remaining months are fetched.

use crate::types::date_window::DateWindow;
use crate::types::month::{days_in_month, Month};
use crate::windowing::error::WindowingError;
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use log::debug;

/// Calendar difference between two instants, relativedelta style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthSpan {
    /// Whole calendar months, after the short-final-month adjustment. May be negative for
    /// ranges shorter than a month that end on an earlier day-of-month than they start.
    pub months: i32,
    /// Time left over after adding the unadjusted whole months to the start.
    pub remainder: Duration,
}

impl MonthSpan {
    /// Number of one-month shifts after window 0, never negative.
    pub fn shift_count(&self) -> u32 {
        self.months.max(0) as u32
    }
}

/// Shifts `time` by `months` calendar months (negative moves backwards).
///
/// Day-1 instants stay on day 1. Any other day is snapped to the last day of the resulting month,
/// which keeps end-of-month instants on the month end across months of different length.
/// The time of day is preserved.
pub fn shift_months(time: NaiveDateTime, months: i32) -> Result<NaiveDateTime, WindowingError> {
    let out_of_range = || WindowingError::DateOutOfRange {
        time,
        months: months as i64,
    };

    let total = time.year() as i64 * 12 + time.month0() as i64 + months as i64;
    let year = i32::try_from(total.div_euclid(12)).map_err(|_| out_of_range())?;
    let month = total.rem_euclid(12) as u32 + 1;

    let day = if time.day() == 1 {
        1
    } else {
        days_in_month(year, month).ok_or_else(out_of_range)?
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .map(|date| date.and_time(time.time()))
        .ok_or_else(out_of_range)
}

/// Moves `time` to the last day of its month, keeping the time of day.
pub fn snap_to_month_end(time: NaiveDateTime) -> Result<NaiveDateTime, WindowingError> {
    let out_of_range = || WindowingError::DateOutOfRange { time, months: 0 };
    let last_day = days_in_month(time.year(), time.month()).ok_or_else(out_of_range)?;
    time.with_day(last_day).ok_or_else(out_of_range)
}

fn add_months_clamped(time: NaiveDateTime, months: i32) -> Result<NaiveDateTime, WindowingError> {
    let shifted = if months >= 0 {
        time.checked_add_months(Months::new(months as u32))
    } else {
        time.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.ok_or(WindowingError::DateOutOfRange {
        time,
        months: months as i64,
    })
}

/// Calendar month difference between `start` and `end`.
///
/// Whole months are counted the way a calendar-aware delta does (day clamped at month end). The
/// count is then decremented once more when a positive number of days remains and the end falls
/// on an earlier day-of-month than the start, so that a trailing partial month is not counted.
pub fn month_span(start: NaiveDateTime, end: NaiveDateTime) -> Result<MonthSpan, WindowingError> {
    if end < start {
        return Err(WindowingError::EndBeforeStart { start, end });
    }

    let mut months =
        (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    let mut anchor = add_months_clamped(start, months)?;
    if anchor > end {
        months -= 1;
        anchor = add_months_clamped(start, months)?;
    }
    let remainder = end - anchor;

    if remainder.num_days() > 0 && end.day() < start.day() {
        months -= 1;
    }

    Ok(MonthSpan { months, remainder })
}

/// Produces the monthly request windows covering `[start, end]`.
///
/// With `N` the [`month_span`] shift count, `N + 1` windows are returned. Window 0 starts at
/// `start` and ends at `end` pulled back into the start month. Each following window is its
/// predecessor shifted forward by one month on both ends.
///
/// # Errors
///
/// [`WindowingError::EndBeforeStart`] if `end < start`.
///
/// # Examples
///
/// ```
/// use wave_reanalysis::{monthly_windows, Month};
///
/// let start = Month(2023, 12).first_instant().unwrap();
/// let end = Month(2024, 2).last_hour().unwrap();
/// let windows = monthly_windows(start, end).unwrap();
///
/// assert_eq!(windows.len(), 3);
/// assert_eq!(windows[2].end().to_string(), "2024-02-29 23:00:00");
/// ```
pub fn monthly_windows(
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<DateWindow>, WindowingError> {
    let shifts = month_span(start, end)?.shift_count();

    let first_end = if shifts == 0 {
        end
    } else {
        snap_to_month_end(shift_months(end, -(shifts as i32))?)?
    };
    let mut current = DateWindow::new(start, first_end).ok_or(WindowingError::EndBeforeStart {
        start,
        end: first_end,
    })?;

    let mut windows = Vec::with_capacity(shifts as usize + 1);
    windows.push(current);
    for _ in 0..shifts {
        let next_start = shift_months(current.start(), 1)?;
        let next_end = shift_months(current.end(), 1)?;
        current = DateWindow::new(next_start, next_end).ok_or(WindowingError::EndBeforeStart {
            start: next_start,
            end: next_end,
        })?;
        windows.push(current);
    }

    debug!(
        "Split {} .. {} into {} monthly windows",
        start,
        end,
        windows.len()
    );
    Ok(windows)
}

/// Windows for an inclusive month range: from day 1 00:00:00 of `start` to the last day 23:00:00 of `end`.
pub fn monthly_windows_for(start: Month, end: Month) -> Result<Vec<DateWindow>, WindowingError> {
    let (from, to) = requested_bounds(start, end)?;
    monthly_windows(from, to)
}

/// The full requested range for an inclusive month range, as a single window.
pub fn requested_range(start: Month, end: Month) -> Result<DateWindow, WindowingError> {
    let (from, to) = requested_bounds(start, end)?;
    DateWindow::new(from, to).ok_or(WindowingError::EndBeforeStart {
        start: from,
        end: to,
    })
}

fn requested_bounds(
    start: Month,
    end: Month,
) -> Result<(NaiveDateTime, NaiveDateTime), WindowingError> {
    let from = start
        .first_instant()
        .ok_or(WindowingError::InvalidMonth(start))?;
    let to = end.last_hour().ok_or(WindowingError::InvalidMonth(end))?;
    Ok((from, to))
}
