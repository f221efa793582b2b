//! Synthetic grids, registries and fetchers shared by unit tests.

use crate::dataset::raw_dataset::RawWindowDataset;
use crate::fetcher::error::FetchError;
use crate::fetcher::window_fetcher::WindowFetcher;
use crate::registry::location_registry::LocationRegistry;
use crate::types::date_window::DateWindow;
use crate::types::location::Location;
use crate::types::month::Month;
use crate::types::series::FeatureVector;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::sync::Mutex;

pub(crate) const FEATURES: [&str; 2] = ["VHM0", "VTM02"];

pub(crate) fn month_window(month: Month) -> DateWindow {
    DateWindow::new(month.first_instant().unwrap(), month.last_hour().unwrap()).unwrap()
}

pub(crate) fn december_2021() -> DateWindow {
    month_window(Month(2021, 12))
}

/// A regular `rows x cols` grid along the coast.
pub(crate) fn grid(rows: usize, cols: usize) -> (Vec<f64>, Vec<f64>) {
    let latitudes = (0..rows).map(|i| 41.95 + 0.025 * i as f64).collect();
    let longitudes = (0..cols).map(|j| 27.10 + 0.025 * j as f64).collect();
    (latitudes, longitudes)
}

/// One location slightly north-east of every grid point, named `beach_00`, `beach_01`, ...
pub(crate) fn beach_registry(latitudes: &[f64], longitudes: &[f64]) -> LocationRegistry {
    let locations = latitudes
        .iter()
        .flat_map(|lat| longitudes.iter().map(move |lon| (*lat, *lon)))
        .enumerate()
        .map(|(i, (lat, lon))| Location::new(format!("beach_{i:02}"), lat + 0.004, lon + 0.004))
        .collect();
    LocationRegistry::new(locations).unwrap()
}

/// Value of `VHM0` the synthetic grid carries at a cell.
pub(crate) fn wave_height(time: NaiveDateTime, latitude: f64, longitude: f64) -> f64 {
    use chrono::Timelike;
    (latitude - 41.0) + (longitude - 27.0) + time.hour() as f64 / 100.0
}

/// Every hour of `window` over the full grid, except cells where `present` returns `false`.
pub(crate) fn synthetic_dataset(
    window: &DateWindow,
    latitudes: &[f64],
    longitudes: &[f64],
    present: impl Fn(NaiveDateTime, (f64, f64)) -> bool,
) -> RawWindowDataset {
    let mut dataset =
        RawWindowDataset::new(*window, FEATURES.iter().map(|f| f.to_string()).collect());
    for time in window.hours() {
        for &lat in latitudes {
            for &lon in longitudes {
                if !present(time, (lat, lon)) {
                    continue;
                }
                let features = FeatureVector(vec![Some(wave_height(time, lat, lon)), Some(4.5)]);
                dataset.insert(time, lat, lon, features).unwrap();
            }
        }
    }
    dataset
}

type DatasetFn = dyn Fn(&DateWindow) -> Result<RawWindowDataset, FetchError> + Send + Sync;

/// A fetcher that builds each window from a closure and records what was requested.
pub(crate) struct ScriptedFetcher {
    build: Box<DatasetFn>,
    requested: Mutex<Vec<DateWindow>>,
}

impl ScriptedFetcher {
    pub(crate) fn new(
        build: impl Fn(&DateWindow) -> Result<RawWindowDataset, FetchError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            build: Box::new(build),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Serves the full grid for every window.
    pub(crate) fn full_grid(latitudes: Vec<f64>, longitudes: Vec<f64>) -> Self {
        Self::new(move |window| {
            Ok(synthetic_dataset(window, &latitudes, &longitudes, |_, _| true))
        })
    }

    /// Serves the full grid, minus `missing` grid points in windows after the first.
    pub(crate) fn dropping_after_first(
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        first: DateWindow,
        missing: Vec<(f64, f64)>,
    ) -> Self {
        Self::new(move |window| {
            let dropped: HashSet<(u64, u64)> = if *window == first {
                HashSet::new()
            } else {
                missing
                    .iter()
                    .map(|(lat, lon)| (lat.to_bits(), lon.to_bits()))
                    .collect()
            };
            Ok(synthetic_dataset(window, &latitudes, &longitudes, |_, (lat, lon)| {
                !dropped.contains(&(lat.to_bits(), lon.to_bits()))
            }))
        })
    }

    pub(crate) fn requested(&self) -> Vec<DateWindow> {
        self.requested.lock().unwrap().clone()
    }
}

impl WindowFetcher for ScriptedFetcher {
    async fn fetch(&self, window: &DateWindow) -> Result<RawWindowDataset, FetchError> {
        self.requested.lock().unwrap().push(*window);
        (self.build)(window)
    }
}
