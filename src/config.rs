//! Runtime configuration loaded from environment variables

use std::env;
use std::path::PathBuf;

/// Sentinel key used by the web demo; treated the same as no key at all.
const DEMO_API_KEY: &str = "demo-api-key";

/// Configuration for the analyzer and its external data sources.
///
/// Every field has a working default so `from_env()` never fails; with no
/// environment set at all the analyzer runs in demo mode (no external
/// calls, deterministic simulation when a seed is provided).
#[derive(Debug, Clone)]
pub struct Config {
    /// Google Maps API key. `None` (or the demo sentinel) puts the whole
    /// pipeline in demo mode: no external calls of any kind are made and
    /// every collector uses its simulation path.
    pub google_api_key: Option<String>,

    /// Optional NYC Open Data app token (higher rate limits).
    pub nyc_app_token: Option<String>,

    /// Optional sqlite cache of resolved properties. `None` disables
    /// caching entirely.
    pub cache_path: Option<PathBuf>,

    /// Seed for the per-analysis RNG. Set in tests for reproducible
    /// simulation output; `None` seeds from entropy.
    pub rng_seed: Option<u64>,

    /// NYC Department of Finance property assessment endpoint.
    pub assessment_url: String,
    /// NYC rolling sales endpoint.
    pub sales_url: String,
    /// NYPD complaint data endpoint.
    pub crime_url: String,
    /// MTA subway stations CSV.
    pub stations_url: String,

    /// Per-request HTTP timeout in seconds.
    pub http_timeout_secs: u64,

    /// Number of synthetic samples used to train the rent model.
    pub training_samples: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let google_api_key = env::var("GOOGLE_MAPS_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty() && k != DEMO_API_KEY);

        Config {
            google_api_key,
            nyc_app_token: env::var("NYC_OPEN_DATA_APP_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            cache_path: env::var("ANALYZER_CACHE_PATH").ok().map(PathBuf::from),
            rng_seed: env::var("ANALYZER_RNG_SEED")
                .ok()
                .and_then(|s| s.parse().ok()),
            assessment_url: env::var("NYC_ASSESSMENT_URL").unwrap_or_else(|_| {
                "https://data.cityofnewyork.us/resource/8y4t-faws.json".to_string()
            }),
            sales_url: env::var("NYC_SALES_URL").unwrap_or_else(|_| {
                "https://data.cityofnewyork.us/resource/w2pb-icbu.json".to_string()
            }),
            crime_url: env::var("NYC_CRIME_URL").unwrap_or_else(|_| {
                "https://data.cityofnewyork.us/resource/5uac-w243.json".to_string()
            }),
            stations_url: env::var("MTA_STATIONS_URL").unwrap_or_else(|_| {
                "http://web.mta.info/developers/data/nyct/subway/Stations.csv".to_string()
            }),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            training_samples: env::var("TRAINING_SAMPLES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1500),
        }
    }

    /// Demo-mode configuration with a fixed seed, used throughout the
    /// test suite. Makes no network calls anywhere in the pipeline.
    pub fn demo() -> Self {
        let mut config = Config::from_env();
        config.google_api_key = None;
        config.cache_path = None;
        config.rng_seed = Some(42);
        config
    }

    /// True when no real geocoding credential is configured. In demo mode
    /// every collector skips its external call and uses the documented
    /// simulation path, so analyses are fully offline.
    pub fn is_demo(&self) -> bool {
        self.google_api_key.is_none()
    }
}
