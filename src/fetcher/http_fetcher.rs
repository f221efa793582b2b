use crate::dataset::raw_dataset::RawWindowDataset;
use crate::fetcher::error::FetchError;
use crate::fetcher::fetcher_config::FetcherConfig;
use crate::fetcher::window_fetcher::WindowFetcher;
use crate::types::date_window::DateWindow;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use async_compression::tokio::bufread::GzipDecoder;
use bincode::config::{Configuration, Fixint, LittleEndian};
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use polars::prelude::*;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tokio::{fs, task};
use tokio_util::io::StreamReader;

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();
const REQUEST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fetches windows from a subsetting web service that answers with gzip-compressed long-form CSV.
///
/// A window is requested with a GET on `base_url` carrying `service`, `product`, the bounding box as
/// `x_lo`/`x_hi` (longitude) and `y_lo`/`y_hi` (latitude), the inclusive time range as `t_lo`/`t_hi`
/// (`YYYY-MM-DD HH:MM:SS`) and one `variable` per feature. Credentials, when configured, are sent as
/// HTTP basic auth. The body must be gzip CSV with a header row of `time`, `latitude`, `longitude`
/// and the feature columns.
///
/// Each parsed window is cached as a bincode file, so re-running a batch over the same months only
/// downloads what is missing. Cache files are keyed by the endpoint, product, bounds and variables
/// as well as the window.
pub struct HttpWindowFetcher {
    config: FetcherConfig,
    base_url: String,
    cache_dir: PathBuf,
    cache_key: String,
    client: Client,
}

impl HttpWindowFetcher {
    /// Creates a fetcher and, when caching is enabled, makes sure the cache directory exists.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MissingBaseUrl`] if the config names no endpoint,
    /// [`FetchError::CacheDirResolution`] if no cache directory is configured and the system cache
    /// directory cannot be determined, or [`FetchError::CacheDirCreation`] if it cannot be created.
    pub async fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let base_url = config
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or(FetchError::MissingBaseUrl)?;
        let cache_dir = match &config.cache_dir {
            Some(dir) => dir.clone(),
            None => get_cache_dir().map_err(FetchError::CacheDirResolution)?,
        };
        if config.use_cache {
            ensure_cache_dir_exists(&cache_dir)
                .await
                .map_err(|e| FetchError::CacheDirCreation(cache_dir.clone(), e))?;
        }
        let cache_key = cache_key(&base_url, &config);
        Ok(Self {
            config,
            base_url,
            cache_dir,
            cache_key,
            client: Client::new(),
        })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The cache file used for `window`.
    pub fn cache_path(&self, window: &DateWindow) -> PathBuf {
        self.cache_dir.join(format!(
            "{}_{}_{}_{}.bin",
            self.config.product_id,
            self.cache_key,
            window.start().format("%Y%m%d%H"),
            window.end().format("%Y%m%d%H")
        ))
    }

    /// Removes the cached copy of `window`. Returns `false` if there was none.
    pub async fn clear_cache(&self, window: &DateWindow) -> Result<bool, FetchError> {
        let path = self.cache_path(window);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FetchError::CacheWrite(path, e)),
        }
    }

    fn request_params(&self, window: &DateWindow) -> Vec<(&'static str, String)> {
        let bounds = &self.config.bounds;
        let mut params = vec![
            ("service", self.config.service_id.clone()),
            ("product", self.config.product_id.clone()),
            ("x_lo", bounds.min_longitude.to_string()),
            ("x_hi", bounds.max_longitude.to_string()),
            ("y_lo", bounds.min_latitude.to_string()),
            ("y_hi", bounds.max_latitude.to_string()),
            ("t_lo", window.start().format(REQUEST_TIME_FORMAT).to_string()),
            ("t_hi", window.end().format(REQUEST_TIME_FORMAT).to_string()),
        ];
        params.extend(
            self.config
                .variables
                .iter()
                .map(|variable| ("variable", variable.clone())),
        );
        params
    }

    /// Downloads and decompresses one window.
    async fn download(&self, window: &DateWindow) -> Result<Vec<u8>, FetchError> {
        let url = self.base_url.clone();
        info!("Requesting window {} from {}", window, url);

        let mut request = self.client.get(&url).query(&self.request_params(window));
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    FetchError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    FetchError::NetworkRequest(url, e)
                });
            }
        };

        // The service reports request errors as an HTML or XML page with a success status.
        let is_markup = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("html") || value.contains("xml"));
        if is_markup {
            let body = response
                .text()
                .await
                .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;
            return Err(FetchError::Provider {
                window: *window,
                message: provider_message(&body),
            });
        }

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let stream_reader = StreamReader::new(stream);
        let mut decoder = GzipDecoder::new(stream_reader);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).await?;
        info!(
            "Downloaded and decompressed {} bytes for window {}",
            decompressed.len(),
            window
        );
        Ok(decompressed)
    }

    /// Parses long-form CSV bytes (with header) into a dataset on a blocking task.
    async fn csv_to_dataset(
        bytes: Vec<u8>,
        window: DateWindow,
    ) -> Result<RawWindowDataset, FetchError> {
        task::spawn_blocking(move || {
            let csv_io = |source| FetchError::CsvReadIo { window, source };
            let csv_polars = |source| FetchError::CsvReadPolars { window, source };

            let mut temp_file = NamedTempFile::new().map_err(csv_io)?;
            temp_file.write_all(&bytes).map_err(csv_io)?;
            temp_file.flush().map_err(csv_io)?;

            let df = CsvReadOptions::default()
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(temp_file.path().to_path_buf()))
                .map_err(csv_polars)?
                .finish()
                .map_err(csv_polars)?;
            debug!("Parsed {} CSV rows for window {}", df.height(), window);

            RawWindowDataset::from_dataframe(&df, window)
                .map_err(|source| FetchError::Dataset { window, source })
        })
        .await?
    }

    async fn read_cached(path: &Path) -> Result<RawWindowDataset, FetchError> {
        let path = path.to_path_buf();
        task::spawn_blocking(move || {
            let bytes = std::fs::read(&path).map_err(|e| FetchError::CacheRead(path.clone(), e))?;
            let (dataset, _) =
                bincode::serde::decode_from_slice::<RawWindowDataset, _>(&bytes, BINCODE_CONFIG)
                    .map_err(|e| FetchError::CacheDecode(path.clone(), Box::new(e)))?;
            Ok(dataset)
        })
        .await?
    }

    async fn cache_dataset(dataset: RawWindowDataset, path: &Path) -> Result<(), FetchError> {
        let bytes = task::spawn_blocking(move || {
            bincode::serde::encode_to_vec(&dataset, BINCODE_CONFIG)
                .map_err(|e| FetchError::CacheEncode(Box::new(e)))
        })
        .await??;
        fs::write(path, &bytes)
            .await
            .map_err(|e| FetchError::CacheWrite(path.to_path_buf(), e))?;
        debug!("Wrote {} cache bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

impl WindowFetcher for HttpWindowFetcher {
    async fn fetch(&self, window: &DateWindow) -> Result<RawWindowDataset, FetchError> {
        let cache_path = self.cache_path(window);

        if self.config.use_cache {
            if fs::metadata(&cache_path).await.is_ok() {
                info!("Cache hit for window {} at {:?}", window, cache_path);
                return Self::read_cached(&cache_path).await;
            }
            warn!("Cache miss for window {}. Downloading.", window);
        }

        let bytes = self.download(window).await?;
        let dataset = Self::csv_to_dataset(bytes, *window).await?;

        if self.config.use_cache {
            Self::cache_dataset(dataset.clone(), &cache_path).await?;
            info!("Cached window {} to {:?}", window, cache_path);
        }
        Ok(dataset)
    }
}

/// Checksum of everything besides the window that shapes a downloaded dataset.
fn cache_key(base_url: &str, config: &FetcherConfig) -> String {
    let mut hasher = crc32fast::Hasher::new();
    for part in [base_url, &config.service_id, &config.product_id] {
        hasher.update(part.as_bytes());
        hasher.update(&[0]);
    }
    let bounds = &config.bounds;
    for value in [
        bounds.min_longitude,
        bounds.max_longitude,
        bounds.min_latitude,
        bounds.max_latitude,
    ] {
        hasher.update(&value.to_bits().to_le_bytes());
    }
    for variable in &config.variables {
        hasher.update(variable.as_bytes());
        hasher.update(&[0]);
    }
    format!("{:08x}", hasher.finalize())
}

fn provider_message(body: &str) -> String {
    let text: String = body
        .split(['<', '>'])
        .enumerate()
        .filter(|(i, _)| i % 2 == 0)
        .map(|(_, part)| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        "empty error response".to_string()
    } else {
        text
    }
}
