mod assembler;
mod dataset;
mod error;
mod export;
mod fetcher;
mod grid;
mod orchestrator;
mod registry;
mod types;
mod utils;
mod windowing;

#[cfg(test)]
mod test_support;

pub use error::ReanalysisError;

pub use orchestrator::batch_orchestrator::*;
pub use orchestrator::error::BatchError;

pub use windowing::calendar_windowing::*;
pub use windowing::error::WindowingError;

pub use grid::error::{GridError, ResolutionError};
pub use grid::grid_resolver::{nearest, GridAxis, GridMatch};

pub use registry::error::RegistryError;
pub use registry::location_registry::LocationRegistry;

pub use dataset::error::DatasetError;
pub use dataset::raw_dataset::{RawWindowDataset, LATITUDE_COLUMN, LONGITUDE_COLUMN, TIME_COLUMN};

pub use assembler::error::{AssemblyError, CompletenessError};
pub use assembler::series_assembler::SeriesAssembler;

pub use fetcher::error::FetchError;
pub use fetcher::fetcher_config::*;
pub use fetcher::http_fetcher::HttpWindowFetcher;
pub use fetcher::window_fetcher::WindowFetcher;

pub use export::error::ExportError;
pub use export::series_export::table_name;

pub use types::date_window::DateWindow;
pub use types::location::{Axis, Location, ResolvedPoint};
pub use types::month::{Month, ParseMonthError};
pub use types::series::*;
