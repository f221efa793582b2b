//! The provider's response for one window, indexed by `(time, grid latitude, grid longitude)`.

use crate::dataset::error::DatasetError;
use crate::grid::grid_resolver::GridAxis;
use crate::types::date_window::DateWindow;
use crate::types::location::Axis;
use crate::types::series::FeatureVector;
use chrono::{DateTime, NaiveDateTime};
use log::{debug, warn};
use ordered_float::OrderedFloat;
use polars::prelude::{DataFrame, DataType, TimeUnit};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const TIME_COLUMN: &str = "time";
pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";

const TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%SZ"];

type Coordinate = OrderedFloat<f64>;
type LongitudeRow = BTreeMap<Coordinate, FeatureVector>;
type LatitudeGrid = BTreeMap<Coordinate, LongitudeRow>;

/// Long-form gridded data for a single [`DateWindow`].
///
/// Cells are nested `time -> latitude -> longitude`, so the longitudes available at a latitude
/// may differ per latitude, as they do on an irregular coastal grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWindowDataset {
    window: DateWindow,
    feature_names: Vec<String>,
    cells: BTreeMap<NaiveDateTime, LatitudeGrid>,
}

impl RawWindowDataset {
    pub fn new(window: DateWindow, feature_names: Vec<String>) -> Self {
        Self {
            window,
            feature_names,
            cells: BTreeMap::new(),
        }
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Number of `(time, lat, lon)` cells.
    pub fn len(&self) -> usize {
        self.cells
            .values()
            .flat_map(|grid| grid.values())
            .map(|row| row.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Inserts a cell. The first value stored for a key wins; returns `false` for a duplicate key.
    pub fn insert(
        &mut self,
        time: NaiveDateTime,
        latitude: f64,
        longitude: f64,
        features: FeatureVector,
    ) -> Result<bool, DatasetError> {
        if features.len() != self.feature_names.len() {
            return Err(DatasetError::FeatureCountMismatch {
                expected: self.feature_names.len(),
                found: features.len(),
            });
        }
        let row = self
            .cells
            .entry(time)
            .or_default()
            .entry(OrderedFloat(latitude))
            .or_default();
        if row.contains_key(&OrderedFloat(longitude)) {
            return Ok(false);
        }
        row.insert(OrderedFloat(longitude), features);
        Ok(true)
    }

    /// Timestamps present in the dataset, ascending.
    pub fn time_axis(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.cells.keys().copied()
    }

    /// Every latitude that occurs at any timestamp.
    pub fn latitude_axis(&self) -> GridAxis {
        let latitudes: BTreeSet<Coordinate> = self
            .cells
            .values()
            .flat_map(|grid| grid.keys().copied())
            .collect();
        GridAxis::from_sorted(latitudes.into_iter().map(|c| c.into_inner()).collect())
    }

    /// Every longitude that occurs at `latitude` at any timestamp.
    pub fn longitude_axis_at(&self, latitude: f64) -> GridAxis {
        let key = OrderedFloat(latitude);
        let longitudes: BTreeSet<Coordinate> = self
            .cells
            .values()
            .filter_map(|grid| grid.get(&key))
            .flat_map(|row| row.keys().copied())
            .collect();
        GridAxis::from_sorted(longitudes.into_iter().map(|c| c.into_inner()).collect())
    }

    pub fn get(&self, time: NaiveDateTime, latitude: f64, longitude: f64) -> Option<&FeatureVector> {
        self.cell(time, latitude, longitude).ok()
    }

    /// Looks up one cell. On a miss, reports which axis key was absent at `time`.
    pub fn cell(
        &self,
        time: NaiveDateTime,
        latitude: f64,
        longitude: f64,
    ) -> Result<&FeatureVector, Axis> {
        let row = self
            .cells
            .get(&time)
            .and_then(|grid| grid.get(&OrderedFloat(latitude)))
            .ok_or(Axis::Latitude)?;
        row.get(&OrderedFloat(longitude)).ok_or(Axis::Longitude)
    }

    /// Builds a dataset from a long-form frame with `time`, `latitude` and `longitude` columns.
    /// Every other column is a feature, in frame order.
    ///
    /// Rows outside `window` are skipped. Rows where every feature is null are dropped, and so
    /// are duplicate keys after the first.
    pub fn from_dataframe(df: &DataFrame, window: DateWindow) -> Result<Self, DatasetError> {
        let column_names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let feature_names: Vec<String> = column_names
            .iter()
            .filter(|name| {
                !matches!(
                    name.as_str(),
                    TIME_COLUMN | LATITUDE_COLUMN | LONGITUDE_COLUMN
                )
            })
            .cloned()
            .collect();

        let times = time_values(df, TIME_COLUMN)?;
        let latitudes = float_values(df, LATITUDE_COLUMN)?;
        let longitudes = float_values(df, LONGITUDE_COLUMN)?;
        let features = feature_names
            .iter()
            .map(|name| float_values(df, name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut dataset = Self::new(window, feature_names);
        let (mut outside, mut empty, mut duplicates) = (0usize, 0usize, 0usize);

        for row in 0..df.height() {
            let (Some(time), Some(latitude), Some(longitude)) =
                (times[row], latitudes[row], longitudes[row])
            else {
                return Err(DatasetError::NullCoordinate { row });
            };
            if !window.contains(time) {
                outside += 1;
                continue;
            }
            let vector = FeatureVector(features.iter().map(|column| column[row]).collect());
            if vector.is_all_missing() {
                empty += 1;
                continue;
            }
            if !dataset.insert(time, latitude, longitude, vector)? {
                duplicates += 1;
            }
        }

        if outside > 0 {
            debug!("Skipped {} rows outside window {}", outside, window);
        }
        if empty > 0 {
            debug!("Dropped {} all-null rows in window {}", empty, window);
        }
        if duplicates > 0 {
            warn!(
                "Ignored {} duplicate (time, latitude, longitude) rows in window {}",
                duplicates, window
            );
        }
        Ok(dataset)
    }
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DatasetError> {
    let column = df
        .column(name)
        .map_err(|e| DatasetError::ColumnNotFound(name.to_string(), e))?;
    let column_type = |source| DatasetError::ColumnType {
        column: name.to_string(),
        expected: "f64",
        source,
    };
    let casted = column.cast(&DataType::Float64).map_err(column_type)?;
    let values = casted.f64().map_err(column_type)?;
    Ok(values.into_iter().collect())
}

fn time_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDateTime>>, DatasetError> {
    let column = df
        .column(name)
        .map_err(|e| DatasetError::ColumnNotFound(name.to_string(), e))?;
    let column_type = |source| DatasetError::ColumnType {
        column: name.to_string(),
        expected: "datetime",
        source,
    };

    match column.dtype() {
        DataType::String => column
            .str()
            .map_err(column_type)?
            .into_iter()
            .map(|value| value.map(parse_time).transpose())
            .collect(),
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let physical = column.cast(&DataType::Int64).map_err(column_type)?;
            physical
                .i64()
                .map_err(column_type)?
                .into_iter()
                .map(|value| value.map(|raw| from_epoch(raw, unit)).transpose())
                .collect()
        }
        other => Err(DatasetError::UnsupportedTimeType {
            dtype: other.to_string(),
        }),
    }
}

pub(crate) fn parse_time(value: &str) -> Result<NaiveDateTime, DatasetError> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value.trim(), format).ok())
        .ok_or_else(|| DatasetError::InvalidTime(value.to_string()))
}

fn from_epoch(raw: i64, unit: TimeUnit) -> Result<NaiveDateTime, DatasetError> {
    let datetime = match unit {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(raw),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(raw),
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(raw)),
    };
    datetime
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| DatasetError::InvalidTime(raw.to_string()))
}
