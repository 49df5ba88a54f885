//! Shared HTTP client with per-API rate limiting
//!
//! Every external source goes through this client so that minimum
//! inter-request delays are enforced per API name, mirroring the
//! strictly sequential call model of the pipeline.

use anyhow::Result;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Minimum delays between calls to the same API.
pub const GEOCODING_DELAY: Duration = Duration::from_millis(100);
pub const PLACES_DELAY: Duration = Duration::from_millis(100);
pub const NYC_PROPERTY_DELAY: Duration = Duration::from_secs(1);
pub const NYC_CRIME_DELAY: Duration = Duration::from_secs(1);

pub struct SourceClient {
    http: Client,
    last_request: Mutex<HashMap<&'static str, Instant>>,
}

impl SourceClient {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("nyc-property-analyzer/0.1 (research project)")
            .build()?;

        Ok(SourceClient {
            http,
            last_request: Mutex::new(HashMap::new()),
        })
    }

    /// Sleep until at least `min_delay` has passed since the last call to
    /// `api_name`, then record the new call time.
    async fn respect_rate_limit(&self, api_name: &'static str, min_delay: Duration) {
        let wait = {
            let last = self.last_request.lock().expect("rate limit lock poisoned");
            last.get(api_name)
                .and_then(|t| min_delay.checked_sub(t.elapsed()))
        };

        if let Some(wait) = wait {
            debug!("Rate limiting {}: sleeping {:?}", api_name, wait);
            tokio::time::sleep(wait).await;
        }

        self.last_request
            .lock()
            .expect("rate limit lock poisoned")
            .insert(api_name, Instant::now());
    }

    /// GET a JSON document with query parameters, honoring the per-API
    /// rate limit.
    pub async fn get_json(
        &self,
        api_name: &'static str,
        min_delay: Duration,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value> {
        self.respect_rate_limit(api_name, min_delay).await;

        let response = self.http.get(url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP request to {} failed: {}", api_name, status);
        }

        Ok(response.json().await?)
    }

    /// GET a plain-text document (used for the stations CSV).
    pub async fn get_text(
        &self,
        api_name: &'static str,
        min_delay: Duration,
        url: &str,
    ) -> Result<String> {
        self.respect_rate_limit(api_name, min_delay).await;

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP request to {} failed: {}", api_name, status);
        }

        Ok(response.text().await?)
    }
}
