pub mod calendar_windowing;
pub mod error;
