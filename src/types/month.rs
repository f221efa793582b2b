//! Calendar month value type used to express month-granular request ranges.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// A calendar month, `Month(year, month)` with `month` in `1..=12`.
///
/// # Examples
///
/// ```
/// use wave_reanalysis::Month;
///
/// let month: Month = "2024-02".parse().unwrap();
/// assert_eq!(month, Month(2024, 2));
/// assert_eq!(month.to_string(), "2024-02");
/// assert_eq!(month.last_hour().unwrap().to_string(), "2024-02-29 23:00:00");
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Month(pub i32, pub u32);

impl Month {
    pub fn year(self) -> i32 {
        self.0
    }
    pub fn month(self) -> u32 {
        self.1
    }

    /// Number of days in this month, `None` if the month number is invalid.
    pub fn days(self) -> Option<u32> {
        days_in_month(self.0, self.1)
    }

    /// Day 1, 00:00:00.
    pub fn first_instant(self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.0, self.1, 1)?.and_hms_opt(0, 0, 0)
    }

    /// Last day of the month, 23:00:00. This is the last hourly sample the provider serves for the month.
    pub fn last_hour(self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.0, self.1, self.days()?)?.and_hms_opt(23, 0, 0)
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0, self.1)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid month '{0}', expected YYYY-MM")]
pub struct ParseMonthError(pub String);

impl FromStr for Month {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMonthError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        if !(1..=12).contains(&month) {
            return Err(err());
        }
        Ok(Month(year, month))
    }
}

pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let (next_month_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    let first_day_of_next_month = NaiveDate::from_ymd_opt(next_month_year, next_month, 1)?;
    let last_day_of_current_month = first_day_of_next_month - Duration::days(1);
    Some(chrono::Datelike::day(&last_day_of_current_month))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_in_month_leap_years() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(1900, 2), Some(28));
        assert_eq!(days_in_month(2000, 2), Some(29));
        assert_eq!(days_in_month(2021, 12), Some(31));
        assert_eq!(days_in_month(2021, 4), Some(30));
        assert_eq!(days_in_month(2021, 13), None);
    }

    #[test]
    fn test_parse_month() {
        assert_eq!("1979-01".parse::<Month>(), Ok(Month(1979, 1)));
        assert_eq!(" 2021-12 ".parse::<Month>(), Ok(Month(2021, 12)));
        assert!("2021-13".parse::<Month>().is_err());
        assert!("2021".parse::<Month>().is_err());
        assert!("abcd-01".parse::<Month>().is_err());
    }

    #[test]
    fn test_month_bounds() {
        let feb = Month(2023, 2);
        assert_eq!(feb.first_instant().unwrap().to_string(), "2023-02-01 00:00:00");
        assert_eq!(feb.last_hour().unwrap().to_string(), "2023-02-28 23:00:00");
        assert_eq!(Month(2023, 0).first_instant(), None);
    }
}
