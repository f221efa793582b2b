//! Slices each fetched window at the resolved grid points and appends the results per location.

use crate::assembler::error::{AssemblyError, CompletenessError};
use crate::dataset::raw_dataset::RawWindowDataset;
use crate::grid::error::ResolutionError;
use crate::registry::location_registry::LocationRegistry;
use crate::types::date_window::DateWindow;
use crate::types::location::Axis;
use crate::types::series::{FeatureVector, LocationSeries, SeriesCollection};
use chrono::NaiveDateTime;
use log::{debug, warn};

type Frame = Vec<(NaiveDateTime, FeatureVector)>;

/// Accumulates per-location series across windows, in window order.
#[derive(Debug, Clone)]
pub struct SeriesAssembler {
    expected_count: usize,
    feature_names: Option<Vec<String>>,
    series: Vec<LocationSeries>,
    windows_ingested: usize,
}

impl SeriesAssembler {
    /// `expected_count` is the number of locations every window after the first must produce.
    pub fn new(expected_count: usize) -> Self {
        Self {
            expected_count,
            feature_names: None,
            series: Vec::new(),
            windows_ingested: 0,
        }
    }

    pub fn expected_count(&self) -> usize {
        self.expected_count
    }

    pub fn windows_ingested(&self) -> usize {
        self.windows_ingested
    }

    /// Slices `dataset` at every resolved location and appends one frame per location.
    ///
    /// A location whose grid point is absent at every timestamp of the window produces no frame.
    /// A grid point that is present at some timestamps and absent at others is an error. Nothing is
    /// appended unless the whole window is accepted.
    ///
    /// # Returns
    ///
    /// The number of locations that produced a frame.
    ///
    /// # Errors
    ///
    /// - [`ResolutionError::Unresolved`] if a location has no grid point yet.
    /// - [`ResolutionError::GridPointMissing`] for a partially present grid point.
    /// - [`CompletenessError::FeatureMismatch`] if the feature columns differ from the first window.
    /// - [`CompletenessError::IncompleteWindow`] if `window_index > 0` and the number of frames is
    ///   not the expected count.
    /// - [`CompletenessError::OutOfOrder`] if a frame does not start after its series' last row.
    pub fn ingest(
        &mut self,
        window_index: usize,
        window: &DateWindow,
        registry: &LocationRegistry,
        dataset: &RawWindowDataset,
    ) -> Result<usize, AssemblyError> {
        match &self.feature_names {
            Some(expected) if expected.as_slice() != dataset.feature_names() => {
                return Err(CompletenessError::FeatureMismatch {
                    window: *window,
                    expected: expected.clone(),
                    found: dataset.feature_names().to_vec(),
                }
                .into());
            }
            _ => {}
        }

        let times: Vec<NaiveDateTime> = dataset.time_axis().collect();
        let mut frames: Vec<(usize, Frame)> = Vec::with_capacity(registry.len());

        for (position, location) in registry.locations().iter().enumerate() {
            let point = location
                .resolved()
                .ok_or_else(|| ResolutionError::Unresolved(location.name.clone()))?;

            let mut frame = Frame::with_capacity(times.len());
            let mut first_absent: Option<(NaiveDateTime, Axis)> = None;
            for &time in &times {
                match dataset.cell(time, point.lat_value, point.lon_value) {
                    Ok(features) => frame.push((time, features.clone())),
                    Err(axis) => {
                        first_absent.get_or_insert((time, axis));
                    }
                }
            }

            if frame.is_empty() {
                warn!(
                    "No data for '{}' at grid point ({}, {}) in window {}",
                    location.name, point.lat_value, point.lon_value, window
                );
                continue;
            }
            if let Some((time, axis)) = first_absent {
                return Err(ResolutionError::GridPointMissing {
                    location: location.name.clone(),
                    axis,
                    time,
                }
                .into());
            }
            frames.push((position, frame));
        }

        let produced = frames.len();
        if window_index > 0 && produced != self.expected_count {
            return Err(CompletenessError::IncompleteWindow {
                window: *window,
                expected: self.expected_count,
                found: produced,
            }
            .into());
        }

        if self.series.is_empty() {
            self.series = registry
                .locations()
                .iter()
                .map(|l| LocationSeries::new(l.name.clone()))
                .collect();
        }
        for (position, frame) in &frames {
            let series = &self.series[*position];
            if let (Some(last), Some((time, _))) = (series.last_time(), frame.first()) {
                if *time <= last {
                    return Err(CompletenessError::OutOfOrder {
                        location: series.location.clone(),
                        time: *time,
                        last,
                    }
                    .into());
                }
            }
        }

        for (position, frame) in frames {
            self.series[position].extend_rows(frame);
        }
        if self.feature_names.is_none() {
            self.feature_names = Some(dataset.feature_names().to_vec());
        }
        self.windows_ingested += 1;
        debug!(
            "Window {} ({}) produced frames for {} locations",
            window_index, window, produced
        );
        Ok(produced)
    }

    /// Builds the final collection. Locations that never produced a frame are left out.
    ///
    /// With `require_contiguous`, every series must hold a row for every hour of `requested`.
    pub fn finish(
        self,
        requested: &DateWindow,
        require_contiguous: bool,
    ) -> Result<SeriesCollection, CompletenessError> {
        let series: Vec<LocationSeries> = self
            .series
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();

        if require_contiguous {
            for series in &series {
                let missing = series.missing_hours(requested);
                if let Some(first_missing) = missing.first() {
                    return Err(CompletenessError::MissingHours {
                        location: series.location.clone(),
                        missing: missing.len(),
                        first_missing: *first_missing,
                    });
                }
            }
        }

        Ok(SeriesCollection::new(
            self.feature_names.unwrap_or_default(),
            series,
        ))
    }
}
