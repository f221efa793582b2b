use crate::dataset::raw_dataset::RawWindowDataset;
use crate::fetcher::error::FetchError;
use crate::types::date_window::DateWindow;
use std::future::Future;

/// A source of gridded data, queried one window at a time.
///
/// Implementations return every `(time, latitude, longitude)` cell of the configured product inside
/// `window`. Any error is fatal to the run that requested the window; the caller does not retry.
pub trait WindowFetcher {
    fn fetch(
        &self,
        window: &DateWindow,
    ) -> impl Future<Output = Result<RawWindowDataset, FetchError>> + Send;
}
