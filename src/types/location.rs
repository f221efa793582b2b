//! Defines the locations of interest and the grid point each one is pinned to.

use crate::grid::error::ResolutionError;
use haversine::{distance, Location as HaversineLocation, Units};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// A spatial dimension of the provider grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Display for Axis {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => write!(f, "latitude"),
            Axis::Longitude => write!(f, "longitude"),
        }
    }
}

/// The grid coordinate a location was resolved to, with the axis indices it was found at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPoint {
    /// Index into the window-0 latitude axis.
    pub lat_index: usize,
    /// Grid latitude in decimal degrees.
    pub lat_value: f64,
    /// Index into the longitude sub-axis available at `lat_value`.
    pub lon_index: usize,
    /// Grid longitude in decimal degrees.
    pub lon_value: f64,
}

/// A named point of interest (a beach, in the reference deployment).
///
/// The true coordinate comes from the registry file. The resolved grid point is
/// written exactly once, on first contact with a provider grid, and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Unique name; used as the outer series key.
    pub name: String,
    /// Latitude in decimal degrees as listed in the registry.
    pub true_latitude: f64,
    /// Longitude in decimal degrees as listed in the registry.
    pub true_longitude: f64,
    resolved: Option<ResolvedPoint>,
}

impl Location {
    pub fn new(name: impl Into<String>, true_latitude: f64, true_longitude: f64) -> Self {
        Self {
            name: name.into(),
            true_latitude,
            true_longitude,
            resolved: None,
        }
    }

    pub fn resolved(&self) -> Option<&ResolvedPoint> {
        self.resolved.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Pins the location to a grid point. The existing point is left untouched if the location was
    /// already resolved.
    pub(crate) fn set_resolved(&mut self, point: ResolvedPoint) -> Result<(), ResolutionError> {
        if self.resolved.is_some() {
            return Err(ResolutionError::AlreadyResolved);
        }
        self.resolved = Some(point);
        Ok(())
    }

    /// Great-circle distance in kilometres between the true coordinate and the resolved grid point.
    pub fn offset_km(&self) -> Option<f64> {
        let point = self.resolved.as_ref()?;
        Some(distance(
            HaversineLocation {
                latitude: self.true_latitude,
                longitude: self.true_longitude,
            },
            HaversineLocation {
                latitude: point.lat_value,
                longitude: point.lon_value,
            },
            Units::Kilometers,
        ))
    }
}
