pub mod error;
pub mod grid_resolver;
