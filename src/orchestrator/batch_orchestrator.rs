//! Drives one batch run: window generation, fetching, one-time resolution, assembly and validation.

use crate::assembler::series_assembler::SeriesAssembler;
use crate::error::ReanalysisError;
use crate::export::error::ExportError;
use crate::fetcher::window_fetcher::WindowFetcher;
use crate::orchestrator::error::BatchError;
use crate::registry::location_registry::LocationRegistry;
use crate::types::month::Month;
use crate::types::series::SeriesCollection;
use crate::windowing::calendar_windowing::{monthly_windows_for, requested_range};
use bon::{bon, Builder};
use log::{debug, error, info};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use tokio::task;

/// Settings for a single batch run.
///
/// # Examples
///
/// ```
/// use wave_reanalysis::{BatchConfig, Month};
///
/// let config = BatchConfig::builder()
///     .start(Month(2021, 12))
///     .end(Month(2022, 3))
///     .expected_location_count(63)
///     .build();
/// assert!(config.require_contiguous);
/// assert_eq!(config.output_file_name(), "temporal_beach_data_df_2021_12-2022_3.json");
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct BatchConfig {
    /// First month of the requested range.
    pub start: Month,
    /// Last month of the requested range, inclusive.
    pub end: Month,
    /// Number of locations every window after the first must produce. Defaults to the registry size.
    pub expected_location_count: Option<usize>,
    /// Require every series to cover every hour of the requested range.
    #[builder(default = true)]
    pub require_contiguous: bool,
    /// Directory [`BatchOrchestrator::run_and_write`] writes the split JSON into.
    #[builder(into)]
    pub output_dir: Option<PathBuf>,
}

impl BatchConfig {
    /// File name of the split JSON output, e.g. `temporal_beach_data_df_2021_12-2022_3.json`.
    pub fn output_file_name(&self) -> String {
        format!(
            "temporal_beach_data_df_{}_{}-{}_{}.json",
            self.start.year(),
            self.start.month(),
            self.end.year(),
            self.end.month()
        )
    }
}

/// Progress of a batch run. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Init,
    FetchFirst,
    Resolve,
    FetchRest { window: usize },
    Finalize,
    Done,
    Failed,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Done | BatchState::Failed)
    }
}

impl Display for BatchState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BatchState::Init => write!(f, "init"),
            BatchState::FetchFirst => write!(f, "fetch first window"),
            BatchState::Resolve => write!(f, "resolve locations"),
            BatchState::FetchRest { window } => write!(f, "fetch window {}", window),
            BatchState::Finalize => write!(f, "finalize"),
            BatchState::Done => write!(f, "done"),
            BatchState::Failed => write!(f, "failed"),
        }
    }
}

/// Runs one batch over a month range for a registry of locations.
///
/// The orchestrator is single-use: after [`Self::run`] it is either `Done` or `Failed`, and a
/// second run is rejected. Windows are fetched one at a time, in order. The first window's grid is
/// used to resolve every location; later windows are sliced at the same grid points.
///
/// # Examples
///
/// ```no_run
/// use wave_reanalysis::{
///     BatchConfig, BatchOrchestrator, FetcherConfig, HttpWindowFetcher, LocationRegistry, Month,
///     ReanalysisError,
/// };
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), ReanalysisError> {
/// let registry = LocationRegistry::from_csv(Path::new("beach_info.csv"))?;
/// let fetcher = HttpWindowFetcher::new(
///     FetcherConfig::builder()
///         .base_url("https://waves.example.org/subset")
///         .build(),
/// )
/// .await?;
/// let config = BatchConfig::builder()
///     .start(Month(2021, 12))
///     .end(Month(2022, 2))
///     .output_dir("out")
///     .build();
///
/// let mut batch = BatchOrchestrator::builder()
///     .config(config)
///     .registry(registry)
///     .fetcher(fetcher)
///     .build();
/// let (collection, path) = batch.run_and_write().await?;
/// println!("{} rows written to {:?}", collection.len(), path);
/// # Ok(())
/// # }
/// ```
pub struct BatchOrchestrator<F: WindowFetcher> {
    config: BatchConfig,
    registry: LocationRegistry,
    fetcher: F,
    state: BatchState,
    history: Vec<BatchState>,
}

#[bon]
impl<F: WindowFetcher> BatchOrchestrator<F> {
    #[builder]
    pub fn new(config: BatchConfig, registry: LocationRegistry, fetcher: F) -> Self {
        Self {
            config,
            registry,
            fetcher,
            state: BatchState::Init,
            history: vec![BatchState::Init],
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Every state the run has passed through, starting with `Init`.
    pub fn history(&self) -> &[BatchState] {
        &self.history
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetches every window of the configured range and assembles the per-location series.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::AlreadyRun`] on a used orchestrator. Any other error (windowing, fetch,
    /// resolution or completeness) aborts the run and leaves it in [`BatchState::Failed`]. No partial
    /// output is returned.
    pub async fn run(&mut self) -> Result<SeriesCollection, ReanalysisError> {
        if self.state != BatchState::Init {
            return Err(BatchError::AlreadyRun.into());
        }

        match self.execute().await {
            Ok(collection) => {
                self.transition(BatchState::Done);
                info!(
                    "Assembled {} rows for {} locations from {} to {}",
                    collection.len(),
                    collection.location_count(),
                    self.config.start,
                    self.config.end
                );
                Ok(collection)
            }
            Err(e) => {
                error!("Batch failed during '{}': {}", self.state, e);
                self.transition(BatchState::Failed);
                Err(e)
            }
        }
    }

    /// Runs the batch and, if an output directory is configured, writes the result there as split
    /// JSON named by [`BatchConfig::output_file_name`].
    ///
    /// # Returns
    ///
    /// The collection and the path written to, if any.
    pub async fn run_and_write(
        &mut self,
    ) -> Result<(SeriesCollection, Option<PathBuf>), ReanalysisError> {
        let collection = self.run().await?;
        let Some(dir) = self.config.output_dir.clone() else {
            return Ok((collection, None));
        };

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ExportError::Io(dir.clone(), e))?;
        let path = dir.join(self.config.output_file_name());
        let target = path.clone();
        let collection = task::spawn_blocking(move || {
            collection.write_split_json(&target).map(|_| collection)
        })
        .await
        .map_err(ExportError::from)??;
        Ok((collection, Some(path)))
    }

    async fn execute(&mut self) -> Result<SeriesCollection, ReanalysisError> {
        let expected = match self.config.expected_location_count {
            Some(configured) if configured != self.registry.len() => {
                return Err(BatchError::ExpectedCountMismatch {
                    configured,
                    registry: self.registry.len(),
                }
                .into());
            }
            Some(configured) => configured,
            None => self.registry.len(),
        };
        let windows = monthly_windows_for(self.config.start, self.config.end)?;
        let requested = requested_range(self.config.start, self.config.end)?;
        info!(
            "Requesting {} monthly windows {} for {} locations",
            windows.len(),
            requested,
            expected
        );

        let mut assembler = SeriesAssembler::new(expected);
        for (index, window) in windows.iter().enumerate() {
            if index == 0 {
                self.transition(BatchState::FetchFirst);
            } else {
                self.transition(BatchState::FetchRest { window: index });
            }
            let dataset = self.fetcher.fetch(window).await?;
            debug!("Window {} returned {} cells", window, dataset.len());

            if index == 0 {
                self.transition(BatchState::Resolve);
                self.registry.resolve(&dataset)?;
            }
            let produced = assembler.ingest(index, window, &self.registry, &dataset)?;
            info!(
                "Window {}/{} {}: {} of {} locations",
                index + 1,
                windows.len(),
                window,
                produced,
                expected
            );
        }

        self.transition(BatchState::Finalize);
        Ok(assembler.finish(&requested, self.config.require_contiguous)?)
    }

    fn transition(&mut self, next: BatchState) {
        debug!("Batch state {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::error::CompletenessError;
    use crate::fetcher::error::FetchError;
    use crate::test_support::{beach_registry, grid, month_window, synthetic_dataset, ScriptedFetcher};

    fn config(start: Month, end: Month) -> BatchConfig {
        BatchConfig::builder().start(start).end(end).build()
    }

    #[tokio::test]
    async fn test_run_assembles_every_location() -> Result<(), ReanalysisError> {
        let (latitudes, longitudes) = grid(9, 7);
        let registry = beach_registry(&latitudes, &longitudes);
        assert_eq!(registry.len(), 63);

        let mut batch = BatchOrchestrator::builder()
            .config(
                BatchConfig::builder()
                    .start(Month(2021, 12))
                    .end(Month(2022, 2))
                    .expected_location_count(63)
                    .build(),
            )
            .registry(registry)
            .fetcher(ScriptedFetcher::full_grid(latitudes, longitudes))
            .build();

        let collection = batch.run().await?;
        assert_eq!(collection.location_count(), 63);
        assert_eq!(collection.len(), 63 * (31 + 31 + 28) * 24);
        for series in collection.series() {
            assert_eq!(series.first_time(), Month(2021, 12).first_instant());
            assert_eq!(series.last_time(), Month(2022, 2).last_hour());
        }

        assert_eq!(batch.state(), BatchState::Done);
        assert_eq!(
            batch.history(),
            &[
                BatchState::Init,
                BatchState::FetchFirst,
                BatchState::Resolve,
                BatchState::FetchRest { window: 1 },
                BatchState::FetchRest { window: 2 },
                BatchState::Finalize,
                BatchState::Done,
            ]
        );
        assert_eq!(
            batch.fetcher().requested(),
            vec![
                month_window(Month(2021, 12)),
                month_window(Month(2022, 1)),
                month_window(Month(2022, 2)),
            ]
        );
        assert!(batch.registry().is_resolved());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_location_aborts_run() {
        let (latitudes, longitudes) = grid(9, 7);
        let registry = beach_registry(&latitudes, &longitudes);
        let missing = vec![(latitudes[4], longitudes[3])];
        let fetcher = ScriptedFetcher::dropping_after_first(
            latitudes,
            longitudes,
            month_window(Month(2021, 12)),
            missing,
        );

        let mut batch = BatchOrchestrator::builder()
            .config(config(Month(2021, 12), Month(2022, 2)))
            .registry(registry)
            .fetcher(fetcher)
            .build();

        let result = batch.run().await;
        assert!(matches!(
            result,
            Err(ReanalysisError::Completeness(CompletenessError::IncompleteWindow {
                expected: 63,
                found: 62,
                ..
            }))
        ));
        assert_eq!(batch.state(), BatchState::Failed);
        assert_eq!(batch.fetcher().requested().len(), 2);
    }

    #[tokio::test]
    async fn test_second_run_is_rejected() -> Result<(), ReanalysisError> {
        let (latitudes, longitudes) = grid(1, 2);
        let mut batch = BatchOrchestrator::builder()
            .config(config(Month(2022, 2), Month(2022, 2)))
            .registry(beach_registry(&latitudes, &longitudes))
            .fetcher(ScriptedFetcher::full_grid(latitudes, longitudes))
            .build();

        let collection = batch.run().await?;
        assert_eq!(collection.len(), 2 * 28 * 24);
        assert!(matches!(
            batch.run().await,
            Err(ReanalysisError::Batch(BatchError::AlreadyRun))
        ));
        assert_eq!(batch.state(), BatchState::Done);
        assert_eq!(batch.fetcher().requested().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_provider_error_is_fatal() {
        let (latitudes, longitudes) = grid(2, 2);
        let first = month_window(Month(2021, 12));
        let fetcher = ScriptedFetcher::new(move |window| {
            if *window == first {
                Ok(synthetic_dataset(window, &latitudes, &longitudes, |_, _| true))
            } else {
                Err(FetchError::Provider {
                    window: *window,
                    message: "quota exceeded".into(),
                })
            }
        });
        let (lats, lons) = grid(2, 2);

        let mut batch = BatchOrchestrator::builder()
            .config(config(Month(2021, 12), Month(2022, 3)))
            .registry(beach_registry(&lats, &lons))
            .fetcher(fetcher)
            .build();

        assert!(matches!(
            batch.run().await,
            Err(ReanalysisError::Fetch(FetchError::Provider { .. }))
        ));
        assert_eq!(batch.state(), BatchState::Failed);
        assert_eq!(
            batch.history().last(),
            Some(&BatchState::Failed)
        );
        assert_eq!(batch.history()[3], BatchState::FetchRest { window: 1 });
    }

    #[tokio::test]
    async fn test_expected_count_mismatch_fails_before_fetching() {
        let (latitudes, longitudes) = grid(2, 2);
        let mut batch = BatchOrchestrator::builder()
            .config(
                BatchConfig::builder()
                    .start(Month(2021, 12))
                    .end(Month(2022, 1))
                    .expected_location_count(63)
                    .build(),
            )
            .registry(beach_registry(&latitudes, &longitudes))
            .fetcher(ScriptedFetcher::full_grid(latitudes, longitudes))
            .build();

        assert!(matches!(
            batch.run().await,
            Err(ReanalysisError::Batch(BatchError::ExpectedCountMismatch {
                configured: 63,
                registry: 4
            }))
        ));
        assert_eq!(batch.history(), &[BatchState::Init, BatchState::Failed]);
        assert!(batch.fetcher().requested().is_empty());
    }

    #[tokio::test]
    async fn test_reversed_range_fails() {
        let (latitudes, longitudes) = grid(1, 1);
        let mut batch = BatchOrchestrator::builder()
            .config(config(Month(2022, 3), Month(2021, 12)))
            .registry(beach_registry(&latitudes, &longitudes))
            .fetcher(ScriptedFetcher::full_grid(latitudes, longitudes))
            .build();

        assert!(matches!(
            batch.run().await,
            Err(ReanalysisError::Windowing(_))
        ));
        assert_eq!(batch.state(), BatchState::Failed);
    }

    #[tokio::test]
    async fn test_run_and_write_names_output() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let (latitudes, longitudes) = grid(2, 1);
        let mut batch = BatchOrchestrator::builder()
            .config(
                BatchConfig::builder()
                    .start(Month(2021, 12))
                    .end(Month(2022, 1))
                    .output_dir(dir.path().join("out"))
                    .build(),
            )
            .registry(beach_registry(&latitudes, &longitudes))
            .fetcher(ScriptedFetcher::full_grid(latitudes, longitudes))
            .build();

        let (collection, path) = batch.run_and_write().await?;
        let path = path.unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("temporal_beach_data_df_2021_12-2022_1.json")
        );
        assert_eq!(SeriesCollection::read_split_json(&path)?, collection);
        Ok(())
    }
}
