//! Connection and product settings for [`HttpWindowFetcher`](crate::HttpWindowFetcher).

use crate::fetcher::error::FetchError;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVICE_ID: &str = "BLKSEA_MULTIYEAR_WAV_007_006-TDS";
pub const DEFAULT_PRODUCT_ID: &str = "cmems_mod_blk_wav_my_2.5km_PT1H-i";

/// Wave variables of the Black Sea reanalysis product.
pub const DEFAULT_VARIABLES: [&str; 19] = [
    "VHM0", "VHM0_SW1", "VHM0_SW2", "VHM0_WW", "VMDR", "VMDR_SW1", "VMDR_SW2", "VMDR_WW", "VPED",
    "VSDX", "VSDY", "VTM01_SW1", "VTM01_SW2", "VTM01_WW", "VTM02", "VTM10", "VTMX", "VTPK", "VZMX",
];

/// Geographic subset requested from the provider, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
}

impl Default for BoundingBox {
    /// The Bulgarian Black Sea coast.
    fn default() -> Self {
        Self {
            min_longitude: 27.09038280355556,
            max_longitude: 28.605053299999998,
            min_latitude: 41.9582344,
            max_latitude: 43.742464399999996,
        }
    }
}

/// Settings for fetching windows from a subsetting web service.
///
/// There is no default `base_url`; it must point at an endpoint that answers the subset query of
/// [`HttpWindowFetcher`](crate::HttpWindowFetcher) with gzip-compressed CSV. Every other field has a
/// default, so a JSON config only needs to name what it overrides:
///
/// ```json
/// { "base_url": "https://waves.example.org/subset", "username": "jdoe", "password": "secret" }
/// ```
///
/// # Examples
///
/// ```
/// use wave_reanalysis::FetcherConfig;
///
/// let config = FetcherConfig::builder()
///     .base_url("https://waves.example.org/subset")
///     .username("jdoe")
///     .password("secret")
///     .use_cache(false)
///     .build();
/// assert_eq!(config.variables.len(), 19);
/// assert_eq!(config.product_id, "cmems_mod_blk_wav_my_2.5km_PT1H-i");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct FetcherConfig {
    #[builder(into)]
    pub base_url: Option<String>,
    #[builder(into, default = DEFAULT_SERVICE_ID.to_string())]
    pub service_id: String,
    #[builder(into, default = DEFAULT_PRODUCT_ID.to_string())]
    pub product_id: String,
    #[builder(default)]
    pub bounds: BoundingBox,
    #[builder(default = DEFAULT_VARIABLES.iter().map(|v| v.to_string()).collect())]
    pub variables: Vec<String>,
    #[builder(into)]
    pub username: Option<String>,
    #[builder(into)]
    pub password: Option<String>,
    /// Where window caches are stored. Defaults to a directory under the system cache dir.
    pub cache_dir: Option<PathBuf>,
    #[builder(default = true)]
    pub use_cache: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FetcherConfig {
    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, FetchError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FetchError::ConfigRead(path.to_path_buf(), e))?;
        serde_json::from_str(&text).map_err(|e| FetchError::ConfigParse(path.to_path_buf(), e))
    }
}
