pub mod date_window;
pub mod location;
pub mod month;
pub mod series;
