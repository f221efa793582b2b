use crate::assembler::error::{AssemblyError, CompletenessError};
use crate::dataset::error::DatasetError;
use crate::export::error::ExportError;
use crate::fetcher::error::FetchError;
use crate::grid::error::{GridError, ResolutionError};
use crate::orchestrator::error::BatchError;
use crate::registry::error::RegistryError;
use crate::windowing::error::WindowingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReanalysisError {
    #[error(transparent)]
    Windowing(#[from] WindowingError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Completeness(#[from] CompletenessError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

impl From<AssemblyError> for ReanalysisError {
    fn from(error: AssemblyError) -> Self {
        match error {
            AssemblyError::Resolution(e) => ReanalysisError::Resolution(e),
            AssemblyError::Completeness(e) => ReanalysisError::Completeness(e),
        }
    }
}
