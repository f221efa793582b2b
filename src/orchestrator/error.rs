use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("This batch has already been run; create a new orchestrator")]
    AlreadyRun,

    #[error("Configured location count {configured} differs from the registry size {registry}")]
    ExpectedCountMismatch { configured: usize, registry: usize },
}
