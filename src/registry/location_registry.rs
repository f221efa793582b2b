//! The set of locations a run produces series for, and their one-time grid resolution.

use crate::dataset::raw_dataset::RawWindowDataset;
use crate::grid::error::ResolutionError;
use crate::grid::grid_resolver::GridAxis;
use crate::registry::error::RegistryError;
use crate::types::location::{Axis, Location, ResolvedPoint};
use log::{debug, info};
use polars::prelude::{CsvReadOptions, DataFrame, DataType, SerReader};
use std::collections::HashSet;
use std::path::Path;

pub const NAME_COLUMN: &str = "beach_name";
pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";

/// Ordered, uniquely named locations of interest.
///
/// Resolution happens once, against the grid of the first fetched window, and the resulting grid
/// points are reused for every later window. This relies on the provider grid staying the same for
/// every window of one product. If the grid does change between windows, later windows surface the
/// mismatch as a [`ResolutionError::GridPointMissing`] or as an incomplete window. Locations are
/// never re-resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRegistry {
    locations: Vec<Location>,
}

impl LocationRegistry {
    pub fn new(locations: Vec<Location>) -> Result<Self, RegistryError> {
        if locations.is_empty() {
            return Err(RegistryError::Empty);
        }
        let mut seen = HashSet::with_capacity(locations.len());
        for location in &locations {
            if !seen.insert(location.name.as_str()) {
                return Err(RegistryError::DuplicateName(location.name.clone()));
            }
            if !location.true_latitude.is_finite() || !location.true_longitude.is_finite() {
                return Err(RegistryError::InvalidCoordinate(location.name.clone()));
            }
        }
        Ok(Self { locations })
    }

    /// Reads a registry file with `beach_name`, `latitude` and `longitude` columns.
    /// Other columns, such as a leading index, are ignored.
    pub fn from_csv(path: &Path) -> Result<Self, RegistryError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(|e| RegistryError::CsvRead(path.to_path_buf(), e))?
            .finish()
            .map_err(|e| RegistryError::CsvRead(path.to_path_buf(), e))?;
        debug!("Read {} registry rows from {}", df.height(), path.display());
        Self::from_dataframe(&df)
    }

    pub fn from_dataframe(df: &DataFrame) -> Result<Self, RegistryError> {
        let column = |name: &str| {
            df.column(name)
                .map_err(|e| RegistryError::MissingColumn(name.to_string(), e))
        };
        let column_type = |name: &str| {
            let name = name.to_string();
            move |source| RegistryError::ColumnType {
                column: name,
                source,
            }
        };

        let names = column(NAME_COLUMN)?
            .cast(&DataType::String)
            .map_err(column_type(NAME_COLUMN))?;
        let names = names.str().map_err(column_type(NAME_COLUMN))?;
        let latitudes = column(LATITUDE_COLUMN)?
            .cast(&DataType::Float64)
            .map_err(column_type(LATITUDE_COLUMN))?;
        let latitudes = latitudes.f64().map_err(column_type(LATITUDE_COLUMN))?;
        let longitudes = column(LONGITUDE_COLUMN)?
            .cast(&DataType::Float64)
            .map_err(column_type(LONGITUDE_COLUMN))?;
        let longitudes = longitudes.f64().map_err(column_type(LONGITUDE_COLUMN))?;

        let missing = |row: usize, column: &str| RegistryError::MissingValue {
            row,
            column: column.to_string(),
        };
        let mut locations = Vec::with_capacity(df.height());
        for (row, ((name, latitude), longitude)) in names
            .into_iter()
            .zip(latitudes.into_iter())
            .zip(longitudes.into_iter())
            .enumerate()
        {
            let name = name.ok_or_else(|| missing(row, NAME_COLUMN))?;
            let latitude = latitude.ok_or_else(|| missing(row, LATITUDE_COLUMN))?;
            let longitude = longitude.ok_or_else(|| missing(row, LONGITUDE_COLUMN))?;
            locations.push(Location::new(name.trim(), latitude, longitude));
        }

        Self::new(locations)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn get(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name == name)
    }

    pub fn is_resolved(&self) -> bool {
        self.locations.iter().all(Location::is_resolved)
    }

    /// Pins every location to its nearest grid point in `dataset`.
    ///
    /// Latitude is resolved against the dataset's latitude axis. Longitude is resolved against the
    /// longitudes available at that resolved latitude, not the global longitude axis. Nothing is
    /// written unless every location resolves.
    pub fn resolve(&mut self, dataset: &RawWindowDataset) -> Result<(), ResolutionError> {
        if self.locations.iter().any(Location::is_resolved) {
            return Err(ResolutionError::AlreadyResolved);
        }

        let latitude_axis = dataset.latitude_axis();
        let points = self
            .locations
            .iter()
            .map(|location| resolve_location(location, &latitude_axis, dataset))
            .collect::<Result<Vec<_>, _>>()?;

        for (location, point) in self.locations.iter_mut().zip(points) {
            location.set_resolved(point)?;
            info!(
                "Resolved '{}' ({:.5}, {:.5}) to grid point ({:.5}, {:.5}), {:.2} km away",
                location.name,
                location.true_latitude,
                location.true_longitude,
                point.lat_value,
                point.lon_value,
                location.offset_km().unwrap_or(f64::NAN)
            );
        }
        Ok(())
    }
}

fn resolve_location(
    location: &Location,
    latitude_axis: &GridAxis,
    dataset: &RawWindowDataset,
) -> Result<ResolvedPoint, ResolutionError> {
    let grid_error = |axis| {
        let name = location.name.clone();
        move |source| ResolutionError::Grid {
            location: name,
            axis,
            source,
        }
    };

    let lat = latitude_axis
        .nearest(location.true_latitude)
        .map_err(grid_error(Axis::Latitude))?;
    if !latitude_axis.contains(lat.value) {
        return Err(ResolutionError::AxisValueMissing {
            location: location.name.clone(),
            axis: Axis::Latitude,
            value: lat.value,
        });
    }

    let longitude_axis = dataset.longitude_axis_at(lat.value);
    let lon = longitude_axis
        .nearest(location.true_longitude)
        .map_err(grid_error(Axis::Longitude))?;
    if !longitude_axis.contains(lon.value) {
        return Err(ResolutionError::AxisValueMissing {
            location: location.name.clone(),
            axis: Axis::Longitude,
            value: lon.value,
        });
    }

    Ok(ResolvedPoint {
        lat_index: lat.index,
        lat_value: lat.value,
        lon_index: lon.index,
        lon_value: lon.value,
    })
}
