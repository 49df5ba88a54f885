//! Location feature collection: crime, transit, amenities, neighborhood
//!
//! Every sub-score has a real-data path and a location-pattern fallback.
//! Failures are caught at this boundary, logged, and replaced by the
//! fallback - they never abort an analysis.

use crate::config::Config;
use crate::pipeline::client::{SourceClient, NYC_CRIME_DELAY, PLACES_DELAY};
use crate::pipeline::geo;
use crate::pipeline::types::LocationFeatures;
use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Crime score bounds (higher = safer).
pub const CRIME_SCORE_MIN: f64 = 25.0;
pub const CRIME_SCORE_MAX: f64 = 95.0;

/// Transit score bounds.
pub const TRANSIT_SCORE_MIN: f64 = 35.0;
pub const TRANSIT_SCORE_MAX: f64 = 100.0;

/// Stations scanned per distance query, capped for performance.
const STATION_SCAN_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Crime score
// ---------------------------------------------------------------------------

/// A single NYPD complaint relevant to scoring.
#[derive(Debug, Clone)]
pub struct CrimeIncident {
    pub offense: String,
    pub law_category: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct CrimeRow {
    ofns_desc: Option<String>,
    law_cat_cd: Option<String>,
    cmplnt_fr_dt: Option<String>,
}

fn offense_weight(offense: &str) -> f64 {
    match offense {
        "MURDER & NON-NEGL. MANSLAUGHTER" => 15.0,
        "RAPE" => 12.0,
        "ROBBERY" => 8.0,
        "SEX CRIMES" => 8.0,
        "FELONY ASSAULT" => 7.0,
        "DANGEROUS WEAPONS" => 6.0,
        "BURGLARY" => 5.0,
        "GRAND LARCENY" => 4.0,
        "GRAND LARCENY OF MOTOR VEHICLE" => 4.0,
        "ASSAULT 3 & RELATED OFFENSES" => 3.0,
        "THEFT-FRAUD" => 2.5,
        "PETIT LARCENY" => 2.0,
        "DRUG/NARCOTIC VIOLATIONS" => 2.0,
        "CRIMINAL MISCHIEF & RELATED OF" => 1.5,
        "HARRASSMENT 2" => 1.0,
        "MISCELLANEOUS PENAL LAW" => 0.5,
        "OFFENSES AGAINST PUBLIC ADMINI" => 0.5,
        _ => 1.0,
    }
}

/// Map incidents to a 0-100 safety score with severity weighting and
/// temporal decay, clamped to [25, 95].
pub fn score_from_incidents(incidents: &[CrimeIncident], today: NaiveDate) -> f64 {
    if incidents.is_empty() {
        return 95.0;
    }

    let mut weighted_total = 0.0;
    let mut felony_count = 0u32;
    let mut recent_count = 0u32;

    for incident in incidents {
        let mut weight = offense_weight(&incident.offense.to_uppercase());

        if incident.law_category == "FELONY" {
            weight *= 1.5;
            felony_count += 1;
        }

        if let Some(date) = incident.date {
            let days_ago = (today - date).num_days();
            if days_ago <= 90 {
                weight *= 1.5;
                recent_count += 1;
            } else if days_ago <= 365 {
                weight *= 1.2;
            } else {
                weight *= 0.8;
            }
        }

        weighted_total += weight;
    }

    let mut safety_score = if weighted_total == 0.0 {
        95.0
    } else if weighted_total < 5.0 {
        90.0 - weighted_total
    } else if weighted_total < 15.0 {
        85.0 - (weighted_total - 5.0) * 1.5
    } else if weighted_total < 30.0 {
        70.0 - (weighted_total - 15.0) * 1.2
    } else if weighted_total < 50.0 {
        52.0 - (weighted_total - 30.0) * 0.8
    } else {
        (35.0 - (weighted_total - 50.0) * 0.3).max(25.0)
    };

    if recent_count > 5 {
        safety_score *= 0.9;
    }
    if felony_count > 3 {
        safety_score *= 0.85;
    }

    info!(
        "Crime analysis: {} incidents, {} felonies, {} recent, weighted {:.1}, safety {:.1}",
        incidents.len(),
        felony_count,
        recent_count,
        weighted_total,
        safety_score
    );

    safety_score.clamp(CRIME_SCORE_MIN, CRIME_SCORE_MAX)
}

/// Estimate a crime score from general NYC distance-to-Manhattan safety
/// patterns when incident data is unavailable.
pub fn estimate_crime_score(latitude: f64, longitude: f64, rng: &mut StdRng) -> f64 {
    let distance = geo::distance_to_manhattan(latitude, longitude);

    if distance <= 2.0 {
        rng.gen_range(70.0..85.0)
    } else if distance <= 5.0 {
        rng.gen_range(75.0..90.0)
    } else if distance <= 10.0 {
        rng.gen_range(65.0..80.0)
    } else {
        rng.gen_range(60.0..75.0)
    }
}

async fn query_crime_incidents(
    client: &SourceClient,
    config: &Config,
    latitude: f64,
    longitude: f64,
    radius_miles: f64,
) -> Result<Vec<CrimeIncident>> {
    let lat_offset = radius_miles / 69.0;
    let lng_offset = radius_miles / (69.0 * latitude.to_radians().cos());
    let start_date = (Utc::now() - Duration::days(730)).format("%Y-%m-%d");

    let mut params = vec![
        (
            "$where",
            format!(
                "latitude BETWEEN {} AND {} AND longitude BETWEEN {} AND {} AND \
                 cmplnt_fr_dt >= '{}' AND latitude IS NOT NULL AND longitude IS NOT NULL",
                latitude - lat_offset,
                latitude + lat_offset,
                longitude - lng_offset,
                longitude + lng_offset,
                start_date
            ),
        ),
        ("$select", "ofns_desc, law_cat_cd, cmplnt_fr_dt".to_string()),
        ("$limit", "50000".to_string()),
    ];
    if let Some(token) = &config.nyc_app_token {
        params.push(("$$app_token", token.clone()));
    }

    let value = client
        .get_json("nyc_crime", NYC_CRIME_DELAY, &config.crime_url, &params)
        .await?;
    let rows: Vec<CrimeRow> = serde_json::from_value(value)?;

    Ok(rows
        .into_iter()
        .map(|row| CrimeIncident {
            offense: row.ofns_desc.unwrap_or_default(),
            law_category: row.law_cat_cd.unwrap_or_default(),
            date: row
                .cmplnt_fr_dt
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(&d[..d.len().min(10)], "%Y-%m-%d").ok()),
        })
        .collect())
}

/// Crime score for a location: real NYPD complaint data within a ~0.5
/// mile box over two years, or the distance-banded estimate on any
/// failure.
pub async fn collect_crime_score(
    client: &SourceClient,
    config: &Config,
    latitude: f64,
    longitude: f64,
    rng: &mut StdRng,
) -> f64 {
    if config.is_demo() {
        return estimate_crime_score(latitude, longitude, rng);
    }

    match query_crime_incidents(client, config, latitude, longitude, 0.5).await {
        Ok(incidents) => score_from_incidents(&incidents, Utc::now().date_naive()),
        Err(e) => {
            warn!("Error collecting crime data: {}", e);
            estimate_crime_score(latitude, longitude, rng)
        }
    }
}

// ---------------------------------------------------------------------------
// Transit score
// ---------------------------------------------------------------------------

/// A subway station from the MTA stations table.
#[derive(Debug, Clone)]
pub struct SubwayStation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Parse the MTA stations CSV (GTFS_Latitude / GTFS_Longitude columns).
pub fn parse_stations_csv(csv_text: &str) -> Result<Vec<SubwayStation>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let headers = reader.headers()?.clone();
    let lat_idx = headers.iter().position(|h| h == "GTFS Latitude");
    let lng_idx = headers.iter().position(|h| h == "GTFS Longitude");
    let name_idx = headers.iter().position(|h| h == "Stop Name");

    let (lat_idx, lng_idx) = match (lat_idx, lng_idx) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => anyhow::bail!("stations CSV missing coordinate columns"),
    };

    let mut stations = Vec::new();
    for record in reader.records() {
        let record = record?;
        let lat: f64 = match record.get(lat_idx).and_then(|v| v.trim().parse().ok()) {
            Some(v) => v,
            None => continue,
        };
        let lng: f64 = match record.get(lng_idx).and_then(|v| v.trim().parse().ok()) {
            Some(v) => v,
            None => continue,
        };
        stations.push(SubwayStation {
            name: name_idx
                .and_then(|i| record.get(i))
                .unwrap_or("")
                .to_string(),
            latitude: lat,
            longitude: lng,
        });
    }

    Ok(stations)
}

/// Download the MTA stations table. Called once per process; the result
/// is cached by the analyzer.
pub async fn fetch_subway_stations(
    client: &SourceClient,
    config: &Config,
) -> Result<Vec<SubwayStation>> {
    let text = client
        .get_text("mta_stations", PLACES_DELAY, &config.stations_url)
        .await?;
    let stations = parse_stations_csv(&text)?;
    info!("Loaded {} subway stations", stations.len());
    Ok(stations)
}

fn station_distances(
    stations: &[SubwayStation],
    latitude: f64,
    longitude: f64,
) -> Vec<f64> {
    let mut distances: Vec<f64> = stations
        .iter()
        .take(STATION_SCAN_LIMIT)
        .map(|s| geo::haversine_miles(latitude, longitude, s.latitude, s.longitude))
        .collect();
    distances.sort_by(|a, b| a.total_cmp(b));
    distances
}

/// Transit score from actual station distances; `None` when the station
/// table is empty.
pub fn transit_score_from_stations(
    stations: &[SubwayStation],
    latitude: f64,
    longitude: f64,
) -> Option<f64> {
    let distances = station_distances(stations, latitude, longitude);
    let nearest = *distances.first()?;

    let mut score = if nearest <= 0.1 {
        95.0
    } else if nearest <= 0.25 {
        85.0
    } else if nearest <= 0.5 {
        75.0
    } else if nearest <= 0.75 {
        65.0
    } else if nearest <= 1.0 {
        55.0
    } else {
        (60.0 - (nearest - 1.0) * 10.0).max(35.0)
    };

    // Redundancy bonus for multiple nearby stations
    let avg_3_nearest = if distances.len() >= 3 {
        distances[..3].iter().sum::<f64>() / 3.0
    } else {
        nearest
    };
    if avg_3_nearest < 0.5 {
        score += 5.0;
    }

    let score = score.clamp(TRANSIT_SCORE_MIN, TRANSIT_SCORE_MAX);
    info!(
        "Transit score: {:.1} (nearest subway: {:.2} miles)",
        score, nearest
    );
    Some(score)
}

/// Estimate a transit score from distance to Manhattan when station data
/// is unavailable.
pub fn estimate_transit_score(latitude: f64, longitude: f64, rng: &mut StdRng) -> f64 {
    let distance = geo::distance_to_manhattan(latitude, longitude);

    if distance <= 2.0 {
        rng.gen_range(85.0..100.0)
    } else if distance <= 5.0 {
        rng.gen_range(70.0..90.0)
    } else if distance <= 10.0 {
        rng.gen_range(55.0..75.0)
    } else {
        rng.gen_range(40.0..60.0)
    }
}

/// Distance in miles to the nearest subway station, estimated from the
/// Manhattan distance when the station table is empty.
pub fn nearest_subway_distance(
    stations: &[SubwayStation],
    latitude: f64,
    longitude: f64,
    rng: &mut StdRng,
) -> f64 {
    match station_distances(stations, latitude, longitude).first() {
        Some(nearest) => *nearest,
        None => {
            let manhattan = geo::distance_to_manhattan(latitude, longitude);
            (manhattan / 8.0 + rng.gen_range(0.0..0.3)).max(0.1)
        }
    }
}

// ---------------------------------------------------------------------------
// Amenity score
// ---------------------------------------------------------------------------

/// Weighted amenity categories queried around a property.
const AMENITY_CATEGORIES: &[(&str, f64)] = &[
    ("restaurant", 1.0),
    ("school", 2.5),
    ("hospital", 2.0),
    ("grocery_or_supermarket", 2.0),
    ("bank", 0.8),
    ("pharmacy", 1.2),
    ("park", 2.5),
    ("gym", 1.5),
    ("subway_station", 3.0),
    ("shopping_mall", 1.2),
    ("cafe", 0.8),
    ("library", 1.5),
    ("post_office", 0.5),
];

/// Amenity signals for a location.
#[derive(Debug, Clone)]
pub struct AmenitySummary {
    pub score: f64,
    pub counts: BTreeMap<String, u32>,
    pub total: u32,
}

/// Category-weighted amenity score, clamped to [0, 100].
pub fn weighted_amenity_score(counts: &BTreeMap<String, u32>) -> f64 {
    let weighted_sum: f64 = counts
        .iter()
        .map(|(category, count)| {
            let weight = AMENITY_CATEGORIES
                .iter()
                .find(|(name, _)| name == category)
                .map(|(_, w)| *w)
                .unwrap_or(1.0);
            *count as f64 * weight
        })
        .sum();

    (weighted_sum * 1.5).min(100.0)
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

/// Count nearby places per category via the Places API. Per-category
/// failures count as zero; the query never aborts the analysis.
pub async fn collect_amenities(
    client: &SourceClient,
    config: &Config,
    latitude: f64,
    longitude: f64,
    rng: &mut StdRng,
) -> AmenitySummary {
    let api_key = match &config.google_api_key {
        Some(key) => key.clone(),
        None => return simulate_amenities(latitude, longitude, rng),
    };

    let mut counts = BTreeMap::new();

    for (category, _) in AMENITY_CATEGORIES {
        let params = [
            ("location", format!("{latitude},{longitude}")),
            ("radius", "1000".to_string()),
            ("type", category.to_string()),
            ("key", api_key.clone()),
        ];

        let count = match client
            .get_json(
                "google_places",
                PLACES_DELAY,
                "https://maps.googleapis.com/maps/api/place/nearbysearch/json",
                &params,
            )
            .await
            .and_then(|v| Ok(serde_json::from_value::<PlacesResponse>(v)?))
        {
            Ok(response) => response.results.len() as u32,
            Err(e) => {
                warn!("Error getting {} data: {}", category, e);
                0
            }
        };

        counts.insert(category.to_string(), count);
    }

    let score = weighted_amenity_score(&counts);
    let total = counts.values().sum();
    info!("Amenity score: {:.1} (total amenities: {})", score, total);

    AmenitySummary {
        score,
        counts,
        total,
    }
}

/// Simulated amenity counts scaled by proximity to Manhattan (closer =
/// denser).
pub fn simulate_amenities(latitude: f64, longitude: f64, rng: &mut StdRng) -> AmenitySummary {
    let distance = geo::distance_to_manhattan(latitude, longitude);
    let multiplier = if distance <= 2.0 {
        1.2
    } else if distance <= 5.0 {
        1.0
    } else if distance <= 10.0 {
        0.8
    } else {
        0.6
    };

    let mut counts = BTreeMap::new();
    let ranges: &[(&str, u32, u32)] = &[
        ("restaurant", 8, 25),
        ("school", 1, 4),
        ("park", 1, 6),
        ("hospital", 0, 2),
        ("grocery_or_supermarket", 2, 8),
        ("subway_station", 1, 4),
        ("gym", 1, 5),
    ];
    for (category, low, high) in ranges {
        let count = (rng.gen_range(*low..*high) as f64 * multiplier) as u32;
        counts.insert(category.to_string(), count);
    }

    let total: u32 = counts.values().sum();
    let score = (total as f64 * 2.5).min(100.0);

    AmenitySummary {
        score,
        counts,
        total,
    }
}

// ---------------------------------------------------------------------------
// Neighborhood resolution
// ---------------------------------------------------------------------------

/// Resolve a coarse neighborhood name from latitude/longitude bands.
/// Intentionally approximate - a weighted pick among plausible candidates
/// for the band, not a polygon lookup.
pub fn determine_neighborhood(latitude: f64, longitude: f64, rng: &mut StdRng) -> String {
    let candidates: &[&str] = if latitude > 40.83 {
        if longitude > -73.94 {
            &["Harlem", "East Harlem", "Upper East Side"]
        } else {
            &["Washington Heights", "Inwood", "Hamilton Heights"]
        }
    } else if latitude > 40.78 {
        if longitude > -73.96 {
            &["Upper East Side", "Yorkville", "Carnegie Hill"]
        } else {
            &["Upper West Side", "Morningside Heights", "Manhattan Valley"]
        }
    } else if latitude > 40.75 {
        if longitude > -73.97 {
            &["Midtown East", "Murray Hill", "Gramercy"]
        } else {
            &["Midtown West", "Hell's Kitchen", "Chelsea"]
        }
    } else if latitude > 40.72 {
        if longitude > -73.98 {
            &["East Village", "Gramercy", "Union Square"]
        } else {
            &["West Village", "Greenwich Village", "SoHo", "NoHo"]
        }
    } else if latitude > 40.70 {
        &["Tribeca", "Financial District", "Battery Park"]
    } else if longitude > -73.95 {
        if latitude > 40.68 {
            &["Williamsburg", "Greenpoint", "Long Island City"]
        } else {
            &["DUMBO", "Brooklyn Heights", "Park Slope"]
        }
    } else {
        &["Astoria", "Sunnyside", "Forest Hills", "Flushing"]
    };

    candidates
        .choose(rng)
        .expect("neighborhood candidate lists are non-empty")
        .to_string()
}

// ---------------------------------------------------------------------------
// Combined collection
// ---------------------------------------------------------------------------

/// Walkability is always derived from transit and amenity scores, never
/// independently fetched.
pub fn walkability_score(transit_score: f64, amenity_score: f64) -> f64 {
    (transit_score * 0.6 + amenity_score * 0.4).min(100.0)
}

/// Collect all location features for a coordinate. Each sub-collector
/// independently chooses its real or fallback path; this function cannot
/// fail.
pub async fn collect_location_features(
    client: &SourceClient,
    config: &Config,
    stations: &[SubwayStation],
    latitude: f64,
    longitude: f64,
    rng: &mut StdRng,
) -> LocationFeatures {
    let crime_score = collect_crime_score(client, config, latitude, longitude, rng).await;

    let transit_score = transit_score_from_stations(stations, latitude, longitude)
        .unwrap_or_else(|| estimate_transit_score(latitude, longitude, rng));

    let amenities = collect_amenities(client, config, latitude, longitude, rng).await;

    let features = LocationFeatures {
        crime_score,
        transit_score,
        amenity_score: amenities.score,
        walkability_score: walkability_score(transit_score, amenities.score),
        distance_to_subway: nearest_subway_distance(stations, latitude, longitude, rng),
        distance_to_manhattan: geo::distance_to_manhattan(latitude, longitude),
        neighborhood: determine_neighborhood(latitude, longitude, rng),
        amenity_counts: amenities.counts,
        total_amenities: amenities.total,
    };

    info!(
        "Location features collected: crime {:.1}, transit {:.1}, amenities {:.1}",
        features.crime_score, features.transit_score, features.amenity_score
    );

    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn incident(offense: &str, law_category: &str, days_ago: i64) -> CrimeIncident {
        CrimeIncident {
            offense: offense.to_string(),
            law_category: law_category.to_string(),
            date: Some(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap() - Duration::days(days_ago)),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_crime_score_no_incidents() {
        assert!((score_from_incidents(&[], today()) - 95.0).abs() < 1e-9);
    }

    #[test]
    fn test_crime_score_minor_incidents() {
        let incidents = vec![incident("HARRASSMENT 2", "VIOLATION", 400)];
        let score = score_from_incidents(&incidents, today());
        // Single old harassment: weight 1.0 * 0.8 = 0.8, score 90 - 0.8
        assert!((score - 89.2).abs() < 1e-9);
    }

    #[test]
    fn test_crime_score_clamped() {
        // A wall of recent murders must still floor at 25
        let incidents: Vec<CrimeIncident> = (0..200)
            .map(|_| incident("MURDER & NON-NEGL. MANSLAUGHTER", "FELONY", 10))
            .collect();
        let score = score_from_incidents(&incidents, today());
        assert!((CRIME_SCORE_MIN..=CRIME_SCORE_MAX).contains(&score));
        assert!((score - CRIME_SCORE_MIN).abs() < 1e-9);
    }

    #[test]
    fn test_crime_score_always_in_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for n in [0usize, 1, 5, 20, 80, 500] {
            let incidents: Vec<CrimeIncident> = (0..n)
                .map(|i| {
                    incident(
                        ["ROBBERY", "PETIT LARCENY", "BURGLARY"][i % 3],
                        if i % 2 == 0 { "FELONY" } else { "MISDEMEANOR" },
                        (i as i64 * 13) % 800,
                    )
                })
                .collect();
            let score = score_from_incidents(&incidents, today());
            assert!(
                (CRIME_SCORE_MIN..=CRIME_SCORE_MAX).contains(&score),
                "score {score} out of bounds for {n} incidents"
            );
        }
        // Fallback path respects the documented estimate bands too
        for _ in 0..50 {
            let score = estimate_crime_score(40.7, -73.95, &mut rng);
            assert!((60.0..=90.0).contains(&score));
        }
    }

    fn station(lat: f64, lng: f64) -> SubwayStation {
        SubwayStation {
            name: "Test St".to_string(),
            latitude: lat,
            longitude: lng,
        }
    }

    #[test]
    fn test_transit_score_adjacent_station() {
        let stations = vec![station(40.7580, -73.9855)];
        let score = transit_score_from_stations(&stations, 40.7580, -73.9855).unwrap();
        // Nearest at 0 miles: band 95, +5 redundancy bonus, capped at 100
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_transit_score_far_station() {
        let stations = vec![station(40.9000, -73.7500)];
        let score = transit_score_from_stations(&stations, 40.5000, -74.2000).unwrap();
        assert!((score - TRANSIT_SCORE_MIN).abs() < 1e-9);
    }

    #[test]
    fn test_transit_score_empty_table() {
        assert!(transit_score_from_stations(&[], 40.7580, -73.9855).is_none());
    }

    #[test]
    fn test_transit_score_bands() {
        // Roughly 0.35 miles north of the station: 0.5-mile band
        let stations = vec![station(40.7580, -73.9855)];
        let score = transit_score_from_stations(&stations, 40.7630, -73.9855).unwrap();
        assert!((score - 80.0).abs() < 1e-9); // 75 band + 5 bonus
    }

    #[test]
    fn test_transit_estimate_in_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let score = estimate_transit_score(40.60, -73.95, &mut rng);
            assert!((TRANSIT_SCORE_MIN..=TRANSIT_SCORE_MAX).contains(&score));
        }
    }

    #[test]
    fn test_amenity_score_clamped() {
        let mut counts = BTreeMap::new();
        counts.insert("subway_station".to_string(), 500u32);
        counts.insert("restaurant".to_string(), 500u32);
        assert!((weighted_amenity_score(&counts) - 100.0).abs() < 1e-9);

        let empty = BTreeMap::new();
        assert!((weighted_amenity_score(&empty) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_simulated_amenities_in_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        for (lat, lng) in [(40.7580, -73.9855), (40.58, -73.95), (40.70, -74.25)] {
            let summary = simulate_amenities(lat, lng, &mut rng);
            assert!((0.0..=100.0).contains(&summary.score));
            assert_eq!(summary.total, summary.counts.values().sum::<u32>());
        }
    }

    #[test]
    fn test_walkability_derivation() {
        assert!((walkability_score(80.0, 60.0) - 72.0).abs() < 1e-9);
        assert!((walkability_score(100.0, 100.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_neighborhood_bands() {
        let mut rng = StdRng::seed_from_u64(1);

        // Upper West Side band
        let n = determine_neighborhood(40.7880, -73.9750, &mut rng);
        assert!(
            ["Upper West Side", "Morningside Heights", "Manhattan Valley"].contains(&n.as_str())
        );

        // Lower Manhattan band
        let n = determine_neighborhood(40.7150, -74.0100, &mut rng);
        assert!(["Tribeca", "Financial District", "Battery Park"].contains(&n.as_str()));
    }

    #[test]
    fn test_parse_stations_csv() {
        let csv_text = "Station ID,Stop Name,GTFS Latitude,GTFS Longitude\n\
                        1,Astor Pl,40.730054,-73.991070\n\
                        2,Canal St,40.718803,-74.000193\n\
                        3,bad row,not_a_number,-74.0\n";
        let stations = parse_stations_csv(csv_text).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].name, "Astor Pl");
        assert!((stations[0].latitude - 40.730054).abs() < 1e-9);
    }

    #[test]
    fn test_parse_stations_csv_missing_columns() {
        assert!(parse_stations_csv("a,b\n1,2\n").is_err());
    }

    #[tokio::test]
    async fn test_collect_features_demo_mode() {
        let client = SourceClient::new(5).unwrap();
        let config = Config::demo();
        let mut rng = StdRng::seed_from_u64(42);

        let features =
            collect_location_features(&client, &config, &[], 40.7880, -73.9624, &mut rng).await;

        assert!((CRIME_SCORE_MIN..=CRIME_SCORE_MAX).contains(&features.crime_score));
        assert!((TRANSIT_SCORE_MIN..=TRANSIT_SCORE_MAX).contains(&features.transit_score));
        assert!((0.0..=100.0).contains(&features.amenity_score));
        assert!((0.0..=100.0).contains(&features.walkability_score));
        assert!(features.distance_to_subway >= 0.0);
        assert!(features.distance_to_manhattan >= 0.0);
        assert!(!features.neighborhood.is_empty());
    }
}
