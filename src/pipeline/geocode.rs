//! Geocoding and coordinate validation
//!
//! Converts addresses to coordinates via the Google Geocoding API and
//! cross-checks the result by reverse-geocoding and address similarity.
//! Without a credential the geocoder returns a pseudo-random NYC-centered
//! coordinate tagged `simulated` instead of calling out.

use crate::config::Config;
use crate::error::AnalysisError;
use crate::pipeline::address;
use crate::pipeline::client::{SourceClient, GEOCODING_DELAY};
use crate::pipeline::geo;
use crate::pipeline::types::{Coordinates, DataTier};
use rand::rngs::StdRng;
use rand::Rng;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{error, warn};

/// Reverse-geocode similarity below which coordinates are considered a
/// mismatch for the input address.
pub const VALIDATION_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Outcome of cross-validating coordinates against the input address.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub confidence: f64,
    pub issues: Vec<String>,
    pub reverse_address: Option<String>,
}

impl ValidationResult {
    fn invalid(issue: String) -> Self {
        ValidationResult {
            is_valid: false,
            confidence: 0.0,
            issues: vec![issue],
            reverse_address: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

fn ny_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bNY\b").expect("valid regex"))
}

/// Basic format checks applied before any external call: minimum length,
/// a street number, and some indication the address is in NYC.
pub fn validate_address_format(address: &str) -> Result<(), AnalysisError> {
    let trimmed = address.trim();

    if trimmed.len() < 10 {
        return Err(AnalysisError::invalid_address("address is too short"));
    }

    if !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return Err(AnalysisError::invalid_address(
            "address must include a street number",
        ));
    }

    let upper = trimmed.to_uppercase();
    let mentions_nyc = upper.contains("NEW YORK")
        || upper.contains("NYC")
        || upper.contains("MANHATTAN")
        || upper.contains("BROOKLYN")
        || upper.contains("BRONX")
        || upper.contains("QUEENS")
        || upper.contains("STATEN ISLAND")
        || ny_token_re().is_match(&upper);

    if !mentions_nyc {
        return Err(AnalysisError::invalid_address(
            "address must mention New York City or a borough",
        ));
    }

    Ok(())
}

/// Pseudo-random coordinate near the center of Manhattan, used whenever
/// no geocoding credential is configured.
pub fn simulated_coordinates(address: &str, rng: &mut StdRng) -> Coordinates {
    let base = geo::MANHATTAN_CENTER;
    Coordinates {
        latitude: base.0 + rng.gen_range(-0.05..0.05),
        longitude: base.1 + rng.gen_range(-0.05..0.05),
        formatted_address: address.to_string(),
        quality: DataTier::Simulated,
        validation_issues: Vec::new(),
    }
}

/// Geocode an address constrained to NYC. Returns `None` when the service
/// has no result or the request fails; the caller decides the fallback.
pub async fn geocode_address(
    client: &SourceClient,
    config: &Config,
    address: &str,
    rng: &mut StdRng,
) -> Option<Coordinates> {
    let api_key = match &config.google_api_key {
        Some(key) => key.clone(),
        None => return Some(simulated_coordinates(address, rng)),
    };

    let params = [
        ("address", format!("{address}, New York, NY")),
        (
            "components",
            "locality:New York|administrative_area:NY|country:US".to_string(),
        ),
        ("key", api_key),
    ];

    let response = client
        .get_json(
            "geocoding",
            GEOCODING_DELAY,
            "https://maps.googleapis.com/maps/api/geocode/json",
            &params,
        )
        .await;

    let value = match response {
        Ok(value) => value,
        Err(e) => {
            error!("Error geocoding address {}: {}", address, e);
            return None;
        }
    };

    let parsed: GeocodeResponse = match serde_json::from_value(value) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("Malformed geocoding response for {}: {}", address, e);
            return None;
        }
    };

    if parsed.status != "OK" || parsed.results.is_empty() {
        warn!("Geocoding failed for {}: {}", address, parsed.status);
        return None;
    }

    let result = &parsed.results[0];
    let mut coordinates = Coordinates {
        latitude: result.geometry.location.lat,
        longitude: result.geometry.location.lng,
        formatted_address: result.formatted_address.clone(),
        quality: DataTier::High,
        validation_issues: Vec::new(),
    };

    // Cross-check the geocode; a failed validation downgrades quality
    // rather than discarding the coordinates.
    let validation = validate_coordinates(
        client,
        config,
        address,
        coordinates.latitude,
        coordinates.longitude,
    )
    .await;

    if !validation.is_valid && !validation.issues.is_empty() {
        warn!(
            "Geocoding validation issues for {}: {:?}",
            address, validation.issues
        );
        coordinates.quality = DataTier::Medium;
        coordinates.validation_issues = validation.issues;
    }

    Some(coordinates)
}

/// Reverse-geocode coordinates to a formatted street address.
async fn reverse_geocode(
    client: &SourceClient,
    config: &Config,
    latitude: f64,
    longitude: f64,
) -> Option<String> {
    let api_key = config.google_api_key.as_ref()?;

    let params = [
        ("latlng", format!("{latitude},{longitude}")),
        ("result_type", "street_address".to_string()),
        ("key", api_key.clone()),
    ];

    let value = client
        .get_json(
            "geocoding",
            GEOCODING_DELAY,
            "https://maps.googleapis.com/maps/api/geocode/json",
            &params,
        )
        .await
        .map_err(|e| error!("Reverse geocoding failed: {}", e))
        .ok()?;

    let parsed: GeocodeResponse = serde_json::from_value(value).ok()?;
    if parsed.status == "OK" {
        parsed.results.first().map(|r| r.formatted_address.clone())
    } else {
        None
    }
}

/// Validate that coordinates plausibly belong to the input address.
///
/// Coordinates outside the NYC bounding box are always invalid. With a
/// real credential the coordinates are reverse-geocoded and compared to
/// the input by similarity; in demo mode the result is valid with 0.5
/// confidence and an explicit limited-validation issue.
pub async fn validate_coordinates(
    client: &SourceClient,
    config: &Config,
    input_address: &str,
    latitude: f64,
    longitude: f64,
) -> ValidationResult {
    if !geo::within_nyc_bounds(latitude, longitude) {
        return ValidationResult::invalid("Coordinates outside NYC boundaries".to_string());
    }

    if config.is_demo() {
        return ValidationResult {
            is_valid: true,
            confidence: 0.5,
            issues: vec!["Demo mode - limited validation".to_string()],
            reverse_address: None,
        };
    }

    match reverse_geocode(client, config, latitude, longitude).await {
        Some(reverse_address) => {
            let confidence = address::similarity(input_address, &reverse_address);
            if confidence >= VALIDATION_SIMILARITY_THRESHOLD {
                ValidationResult {
                    is_valid: true,
                    confidence,
                    issues: Vec::new(),
                    reverse_address: Some(reverse_address),
                }
            } else {
                ValidationResult {
                    is_valid: false,
                    confidence,
                    issues: vec![format!(
                        "Address mismatch: input='{input_address}', \
                         geocoded='{reverse_address}' (similarity: {confidence:.2})"
                    )],
                    reverse_address: Some(reverse_address),
                }
            }
        }
        None => ValidationResult {
            is_valid: false,
            confidence: 0.0,
            issues: vec!["Could not reverse-geocode coordinates".to_string()],
            reverse_address: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_address_format_rejects_short() {
        assert!(validate_address_format("invalid").is_err());
        assert!(validate_address_format("123").is_err());
        assert!(validate_address_format("").is_err());
    }

    #[test]
    fn test_address_format_requires_digit() {
        let err = validate_address_format("Central Park West, New York, NY").unwrap_err();
        assert!(err.to_string().contains("Invalid address format"));
    }

    #[test]
    fn test_address_format_requires_nyc() {
        assert!(validate_address_format("123 Main St, Boston, MA").is_err());
        assert!(validate_address_format("350 Central Park West, New York, NY").is_ok());
        assert!(validate_address_format("200 Bedford Avenue, Brooklyn").is_ok());
    }

    #[test]
    fn test_ny_token_not_matched_inside_words() {
        // "ALBANY" contains "NY" but not as a standalone token
        assert!(validate_address_format("12 State St, Albany").is_err());
    }

    #[test]
    fn test_simulated_coordinates_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let coords = simulated_coordinates("350 Central Park West", &mut rng);
            assert!(geo::within_nyc_bounds(coords.latitude, coords.longitude));
            assert_eq!(coords.quality, DataTier::Simulated);
        }
    }

    #[tokio::test]
    async fn test_validate_outside_bounds() {
        let client = SourceClient::new(5).unwrap();
        let config = Config::demo();

        // Boston coordinates: invalid regardless of mode or similarity
        let result =
            validate_coordinates(&client, &config, "123 Main St, Boston", 42.3601, -71.0589).await;
        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("outside NYC boundaries")));
    }

    #[tokio::test]
    async fn test_validate_demo_mode_is_honest() {
        let client = SourceClient::new(5).unwrap();
        let config = Config::demo();

        let result = validate_coordinates(
            &client,
            &config,
            "350 Central Park West, New York, NY",
            40.7880,
            -73.9624,
        )
        .await;
        assert!(result.is_valid);
        assert!((result.confidence - 0.5).abs() < 1e-9);
        assert!(result.issues.iter().any(|i| i.contains("limited validation")));
    }

    #[tokio::test]
    async fn test_geocode_demo_mode_is_offline() {
        let client = SourceClient::new(5).unwrap();
        let config = Config::demo();
        let mut rng = StdRng::seed_from_u64(42);

        let coords = geocode_address(&client, &config, "350 Central Park West", &mut rng)
            .await
            .unwrap();
        assert_eq!(coords.quality, DataTier::Simulated);
        assert_eq!(coords.formatted_address, "350 Central Park West");
    }
}
