//! Property resolution against the NYC Department of Finance registry
//!
//! Exact match first, then a street-number fuzzy search scored by address
//! similarity with a hard acceptance threshold. When nothing clears the
//! threshold the caller falls back to neighborhood-tier estimation.

use crate::config::Config;
use crate::pipeline::address;
use crate::pipeline::client::{SourceClient, NYC_PROPERTY_DELAY};
use crate::pipeline::types::{
    Coordinates, DataTier, MarketTier, PropertyRecord, PropertySource, PropertyType,
};
use anyhow::Result;
use chrono::NaiveDate;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Minimum similarity for a fuzzy registry candidate to be accepted.
pub const MATCH_THRESHOLD: f64 = 0.75;

/// Maximum fuzzy candidates fetched per street number.
const FUZZY_CANDIDATE_LIMIT: usize = 20;

/// One row of the property assessment registry. Socrata returns every
/// field as a string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssessmentRow {
    pub address: Option<String>,
    pub bldgcl: Option<String>,
    pub unitsres: Option<String>,
    pub bldgarea: Option<String>,
    pub yearbuilt: Option<String>,
    pub avtot: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaleRow {
    sale_price: Option<String>,
    sale_date: Option<String>,
}

/// Most recent sale for a matched property.
#[derive(Debug, Clone)]
pub struct SaleRecord {
    pub price: f64,
    pub date: Option<NaiveDate>,
}

fn escape_soql(value: &str) -> String {
    value.replace('\'', "''")
}

fn with_app_token(config: &Config, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
    if let Some(token) = &config.nyc_app_token {
        params.push(("$$app_token", token.clone()));
    }
    params
}

async fn search_exact(
    client: &SourceClient,
    config: &Config,
    standardized_address: &str,
) -> Result<Vec<AssessmentRow>> {
    let params = with_app_token(
        config,
        vec![
            (
                "$where",
                format!("upper(address) = '{}'", escape_soql(standardized_address)),
            ),
            ("$limit", "1".to_string()),
        ],
    );

    let value = client
        .get_json(
            "nyc_property",
            NYC_PROPERTY_DELAY,
            &config.assessment_url,
            &params,
        )
        .await?;

    Ok(serde_json::from_value(value)?)
}

async fn search_fuzzy(
    client: &SourceClient,
    config: &Config,
    input_address: &str,
) -> Result<Vec<AssessmentRow>> {
    let components = address::parse_components(input_address);
    let street_number = match components.street_number {
        Some(number) => number,
        None => return Ok(Vec::new()),
    };

    let params = with_app_token(
        config,
        vec![
            (
                "$where",
                format!("address LIKE '{}%'", escape_soql(&street_number)),
            ),
            ("$limit", FUZZY_CANDIDATE_LIMIT.to_string()),
            ("$order", "bldgarea DESC".to_string()),
        ],
    );

    let value = client
        .get_json(
            "nyc_property",
            NYC_PROPERTY_DELAY,
            &config.assessment_url,
            &params,
        )
        .await?;

    Ok(serde_json::from_value(value)?)
}

/// Pick the candidate most similar to the original input address.
/// Candidates below the acceptance threshold never match, even when no
/// better candidate exists.
pub fn select_best_candidate<'a>(
    input_address: &str,
    candidates: &'a [AssessmentRow],
) -> Option<&'a AssessmentRow> {
    let mut best: Option<(&AssessmentRow, f64)> = None;

    for candidate in candidates {
        let candidate_address = match &candidate.address {
            Some(a) if !a.is_empty() => a,
            _ => continue,
        };

        let score = address::similarity(input_address, candidate_address);
        debug!(
            "Address similarity: {} vs {} = {:.3}",
            input_address, candidate_address, score
        );

        if score >= MATCH_THRESHOLD && best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }

    match best {
        Some((candidate, score)) => {
            info!(
                "Best property match: {} (similarity: {:.3})",
                candidate.address.as_deref().unwrap_or("N/A"),
                score
            );
            Some(candidate)
        }
        None => {
            warn!(
                "No property matches above {} threshold for {}",
                MATCH_THRESHOLD, input_address
            );
            None
        }
    }
}

async fn fetch_recent_sale(
    client: &SourceClient,
    config: &Config,
    search_address: &str,
) -> Result<Option<SaleRecord>> {
    let params = with_app_token(
        config,
        vec![
            (
                "$where",
                format!(
                    "upper(address) LIKE upper('%{}%')",
                    escape_soql(search_address)
                ),
            ),
            ("$limit", "5".to_string()),
            ("$order", "sale_date DESC".to_string()),
        ],
    );

    let value = client
        .get_json(
            "nyc_property",
            NYC_PROPERTY_DELAY,
            &config.sales_url,
            &params,
        )
        .await?;

    let rows: Vec<SaleRow> = serde_json::from_value(value)?;

    Ok(rows.into_iter().find_map(|row| {
        let price: f64 = row.sale_price.as_deref()?.parse().ok()?;
        if price <= 100_000.0 {
            return None;
        }
        let date = row
            .sale_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(&d[..d.len().min(10)], "%Y-%m-%d").ok());
        Some(SaleRecord { price, date })
    }))
}

fn parse_field<T: std::str::FromStr>(field: &Option<String>) -> Option<T> {
    field.as_deref().and_then(|s| s.trim().parse().ok())
}

/// Derive a standard property record from an assessment row and an
/// optional recent sale.
fn derive_record(
    input_address: &str,
    coordinates: &Coordinates,
    assessment: &AssessmentRow,
    sale: Option<SaleRecord>,
) -> PropertyRecord {
    let building_class = assessment.bldgcl.as_deref().unwrap_or("R4");

    let property_type = if building_class.starts_with('R') {
        if matches!(building_class, "R4" | "R6" | "R7" | "R8" | "R9") {
            PropertyType::Condo
        } else {
            PropertyType::CoOp
        }
    } else if building_class.starts_with('C') {
        PropertyType::CoOp
    } else {
        PropertyType::Condo
    };

    let total_units: u32 = parse_field(&assessment.unitsres).unwrap_or(1);
    let building_area: f64 = parse_field(&assessment.bldgarea).unwrap_or(0.0);
    let year_built: i32 = parse_field(&assessment.yearbuilt).unwrap_or(1980);

    let avg_unit_sqft = if total_units > 0 && building_area > 0.0 {
        building_area / total_units as f64
    } else {
        800.0
    };

    // Bedroom count from average unit size banding
    let (bedrooms, bathrooms) = if avg_unit_sqft < 600.0 {
        (1, 1.0)
    } else if avg_unit_sqft < 900.0 {
        (2, 1.5)
    } else if avg_unit_sqft < 1400.0 {
        (3, 2.0)
    } else {
        (4, 2.5)
    };

    let (last_sale_price, last_sale_date) = match sale {
        Some(sale) => (sale.price, sale.date),
        None => {
            // No usable sale record: assessed value runs roughly half of
            // market value in NYC, so use it as a proxy.
            let assessed: Option<f64> = parse_field(&assessment.avtot);
            let price = assessed.map(|v| v / 0.5).unwrap_or(800_000.0);
            (price, None)
        }
    };

    PropertyRecord {
        address: input_address.to_string(),
        latitude: coordinates.latitude,
        longitude: coordinates.longitude,
        property_type,
        bedrooms,
        bathrooms,
        sqft: (avg_unit_sqft as u32).max(400),
        year_built: year_built.max(1900),
        last_sale_price: last_sale_price.max(300_000.0),
        last_sale_date,
        source: PropertySource::Registry,
        quality: DataTier::High,
    }
}

/// Resolve a property against the registry. Returns `None` when nothing
/// matches above the similarity threshold, when the registry is
/// unreachable, or in demo mode - lookup failures never propagate.
pub async fn resolve_property(
    client: &SourceClient,
    config: &Config,
    input_address: &str,
    coordinates: &Coordinates,
) -> Option<PropertyRecord> {
    if config.is_demo() {
        return None;
    }

    let standardized = address::standardize(input_address);

    match search_exact(client, config, &standardized).await {
        Ok(rows) if !rows.is_empty() => {
            info!("Found exact property match for {}", input_address);
            let sale = fetch_recent_sale(client, config, &standardized)
                .await
                .unwrap_or_default();
            return Some(derive_record(input_address, coordinates, &rows[0], sale));
        }
        Ok(_) => {}
        Err(e) => {
            warn!("Registry exact lookup failed for {}: {}", input_address, e);
            return None;
        }
    }

    let candidates = match search_fuzzy(client, config, input_address).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!("Registry fuzzy lookup failed for {}: {}", input_address, e);
            return None;
        }
    };

    let best = select_best_candidate(input_address, &candidates)?;
    let matched_address = best.address.clone().unwrap_or_default();
    let sale = fetch_recent_sale(client, config, &matched_address)
        .await
        .unwrap_or_default();

    info!("Found validated property match for {}", input_address);
    Some(derive_record(input_address, coordinates, best, sale))
}

/// Market tier of a neighborhood, used to parameterize estimation.
pub fn market_tier(neighborhood: &str) -> MarketTier {
    match neighborhood {
        "Tribeca" | "SoHo" | "West Village" | "Chelsea" => MarketTier::Luxury,
        "Upper East Side" | "Upper West Side" | "Midtown" | "Financial District"
        | "East Village" => MarketTier::MidTier,
        _ => MarketTier::Affordable,
    }
}

/// Synthesize a property record from neighborhood-tier distributions when
/// the registry has no acceptable match.
pub fn estimate_property_by_tier(
    input_address: &str,
    coordinates: &Coordinates,
    neighborhood: &str,
    rng: &mut StdRng,
) -> PropertyRecord {
    struct TierProfile {
        type_choices: &'static [(PropertyType, f64)],
        bedroom_weights: [f64; 4],
        sqft_base: [f64; 4],
        price_base: [f64; 4],
    }

    let profile = match market_tier(neighborhood) {
        MarketTier::Luxury => TierProfile {
            type_choices: &[(PropertyType::Condo, 0.7), (PropertyType::CoOp, 0.3)],
            bedroom_weights: [0.2, 0.4, 0.3, 0.1],
            sqft_base: [800.0, 1200.0, 1600.0, 2200.0],
            price_base: [1_200_000.0, 1_800_000.0, 2_800_000.0, 4_000_000.0],
        },
        MarketTier::MidTier => TierProfile {
            type_choices: &[
                (PropertyType::Condo, 0.4),
                (PropertyType::CoOp, 0.4),
                (PropertyType::Rental, 0.2),
            ],
            bedroom_weights: [0.3, 0.4, 0.2, 0.1],
            sqft_base: [650.0, 1000.0, 1400.0, 1800.0],
            price_base: [800_000.0, 1_300_000.0, 2_000_000.0, 2_800_000.0],
        },
        MarketTier::Affordable => TierProfile {
            type_choices: &[
                (PropertyType::Condo, 0.3),
                (PropertyType::CoOp, 0.3),
                (PropertyType::Rental, 0.4),
            ],
            bedroom_weights: [0.4, 0.4, 0.15, 0.05],
            sqft_base: [550.0, 850.0, 1200.0, 1500.0],
            price_base: [600_000.0, 900_000.0, 1_400_000.0, 1_900_000.0],
        },
    };

    let type_dist = WeightedIndex::new(profile.type_choices.iter().map(|(_, w)| *w))
        .expect("tier weights are positive");
    let property_type = profile.type_choices[type_dist.sample(rng)].0;

    let bedroom_dist =
        WeightedIndex::new(profile.bedroom_weights).expect("tier weights are positive");
    let bedrooms = (bedroom_dist.sample(rng) + 1) as u8;
    let idx = bedrooms as usize - 1;

    let sqft = profile.sqft_base[idx] * rng.gen_range(0.85..1.15);
    let bathrooms = (bedrooms as f64 + [-0.5, 0.0, 0.5][rng.gen_range(0..3)]).max(1.0);
    let last_sale_price = profile.price_base[idx] * rng.gen_range(0.8..1.2);

    debug!(
        "Estimated {}BR {} in {} from tier distributions",
        bedrooms, property_type, neighborhood
    );

    PropertyRecord {
        address: input_address.to_string(),
        latitude: coordinates.latitude,
        longitude: coordinates.longitude,
        property_type,
        bedrooms,
        bathrooms,
        sqft: sqft as u32,
        year_built: rng.gen_range(1960..2020),
        last_sale_price,
        last_sale_date: None,
        source: PropertySource::Estimated,
        quality: DataTier::Medium,
    }
}

/// Fully simulated property used on the terminal fallback path, when
/// even geocoding produced nothing usable.
pub fn simulate_property(
    input_address: &str,
    coordinates: &Coordinates,
    rng: &mut StdRng,
) -> PropertyRecord {
    let type_choices = [
        (PropertyType::Condo, 0.5),
        (PropertyType::CoOp, 0.3),
        (PropertyType::Rental, 0.2),
    ];
    let type_dist = WeightedIndex::new(type_choices.iter().map(|(_, w)| *w))
        .expect("simulation weights are positive");
    let bedroom_dist =
        WeightedIndex::new([0.3, 0.4, 0.2, 0.1]).expect("simulation weights are positive");

    PropertyRecord {
        address: input_address.to_string(),
        latitude: coordinates.latitude,
        longitude: coordinates.longitude,
        property_type: type_choices[type_dist.sample(rng)].0,
        bedrooms: (bedroom_dist.sample(rng) + 1) as u8,
        bathrooms: rng.gen_range(1.0..3.5),
        sqft: rng.gen_range(600..2200),
        year_built: rng.gen_range(1960..2020),
        last_sale_price: rng.gen_range(700_000.0..4_000_000.0),
        last_sale_date: None,
        source: PropertySource::Simulated,
        quality: DataTier::Simulated,
    }
}
