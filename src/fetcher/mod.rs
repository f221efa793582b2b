pub mod error;
pub mod fetcher_config;
pub mod http_fetcher;
pub mod window_fetcher;
