//! Output series types: one ordered hourly series per location, keyed by `(location name, time)`.

use crate::types::date_window::DateWindow;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Name of the outer index level.
pub const LOCATION_INDEX_NAME: &str = "location name";
/// Name of the inner index level.
pub const TIME_INDEX_NAME: &str = "time";

/// One row of wave variables, aligned with the feature names of the dataset it came from.
/// `None` marks a missing value (NaN on the provider side).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector(pub Vec<Option<f64>>);

impl FeatureVector {
    pub fn is_all_missing(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied().flatten()
    }
}

/// Composite two-level key of the assembled collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub location: String,
    pub time: NaiveDateTime,
}

impl SeriesKey {
    pub fn new(location: impl Into<String>, time: NaiveDateTime) -> Self {
        Self {
            location: location.into(),
            time,
        }
    }
}

impl Display for SeriesKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.location, self.time)
    }
}

/// The time-ordered rows of a single location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSeries {
    pub location: String,
    rows: Vec<(NaiveDateTime, FeatureVector)>,
}

impl LocationSeries {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[(NaiveDateTime, FeatureVector)] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_time(&self) -> Option<NaiveDateTime> {
        self.rows.first().map(|(t, _)| *t)
    }

    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.rows.last().map(|(t, _)| *t)
    }

    pub fn times(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.rows.iter().map(|(t, _)| *t)
    }

    pub fn get(&self, time: NaiveDateTime) -> Option<&FeatureVector> {
        self.rows
            .binary_search_by(|(t, _)| t.cmp(&time))
            .ok()
            .map(|i| &self.rows[i].1)
    }

    /// Appends rows whose times are already strictly increasing and strictly after [`Self::last_time`].
    /// The caller checks ordering.
    pub(crate) fn extend_rows(&mut self, rows: Vec<(NaiveDateTime, FeatureVector)>) {
        self.rows.extend(rows);
    }

    /// Hourly instants of `range` that have no row in this series.
    pub fn missing_hours(&self, range: &DateWindow) -> Vec<NaiveDateTime> {
        let mut present = self.rows.iter().map(|(t, _)| *t).peekable();
        let mut missing = Vec::new();
        for hour in range.hours() {
            while present.next_if(|t| *t < hour).is_some() {}
            if present.next_if_eq(&hour).is_none() {
                missing.push(hour);
            }
        }
        missing
    }
}

/// The final artifact: every location's series, in registry order, sharing one set of feature names.
///
/// Conceptually this is an ordered map `location name -> time -> features`; see [`SeriesKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesCollection {
    feature_names: Vec<String>,
    series: Vec<LocationSeries>,
}

impl SeriesCollection {
    pub fn new(feature_names: Vec<String>, series: Vec<LocationSeries>) -> Self {
        Self {
            feature_names,
            series,
        }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Outer and inner index names, in that order.
    pub fn index_names(&self) -> [&'static str; 2] {
        [LOCATION_INDEX_NAME, TIME_INDEX_NAME]
    }

    pub fn series(&self) -> &[LocationSeries] {
        &self.series
    }

    pub fn location_names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.location.as_str())
    }

    pub fn get_series(&self, location: &str) -> Option<&LocationSeries> {
        self.series.iter().find(|s| s.location == location)
    }

    pub fn get(&self, key: &SeriesKey) -> Option<&FeatureVector> {
        self.get_series(&key.location)?.get(key.time)
    }

    /// Number of outer keys.
    pub fn location_count(&self) -> usize {
        self.series.len()
    }

    /// Total number of `(location, time)` rows.
    pub fn len(&self) -> usize {
        self.series.iter().map(LocationSeries::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows in key order: locations in collection order, times ascending within each.
    pub fn iter(&self) -> impl Iterator<Item = (SeriesKey, &FeatureVector)> {
        self.series.iter().flat_map(|s| {
            s.rows
                .iter()
                .map(move |(t, f)| (SeriesKey::new(s.location.clone(), *t), f))
        })
    }
}
