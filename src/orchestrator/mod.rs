pub mod batch_orchestrator;
pub mod error;
