//! Optional sqlite cache of resolved properties
//!
//! Avoids redundant external calls within a session. Keyed by the
//! standardized address, replace-by-key only - never a source of truth,
//! and quality assessments are always recomputed fresh.

use crate::pipeline::types::{LocationFeatures, PropertyRecord};
use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info};

/// A previously resolved property with its location features.
#[derive(Debug, Clone)]
pub struct CachedProperty {
    pub property: PropertyRecord,
    pub location: LocationFeatures,
    pub data_quality_score: u8,
}

pub struct AnalysisCache {
    pool: SqlitePool,
}

impl AnalysisCache {
    /// Open (or create) the cache database and its table.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating cache directory {}", parent.display()))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .context("opening analysis cache")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cached_properties (
                address TEXT PRIMARY KEY,
                property_json TEXT NOT NULL,
                location_json TEXT NOT NULL,
                data_quality_score INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&pool)
        .await?;

        info!("Analysis cache initialized at {}", path.display());
        Ok(AnalysisCache { pool })
    }

    /// Look up a property by standardized address.
    pub async fn lookup(&self, standardized_address: &str) -> Result<Option<CachedProperty>> {
        let row = sqlx::query(
            "SELECT property_json, location_json, data_quality_score \
             FROM cached_properties WHERE address = ?",
        )
        .bind(standardized_address)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let property: PropertyRecord = serde_json::from_str(row.get("property_json"))?;
        let location: LocationFeatures = serde_json::from_str(row.get("location_json"))?;
        let score: i64 = row.get("data_quality_score");

        debug!("Cache hit for {}", standardized_address);
        Ok(Some(CachedProperty {
            property,
            location,
            data_quality_score: score.clamp(0, 100) as u8,
        }))
    }

    /// Store (or replace) the resolved data for an address.
    pub async fn store(
        &self,
        standardized_address: &str,
        property: &PropertyRecord,
        location: &LocationFeatures,
        data_quality_score: u8,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO cached_properties \
             (address, property_json, location_json, data_quality_score) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(standardized_address)
        .bind(serde_json::to_string(property)?)
        .bind(serde_json::to_string(location)?)
        .bind(data_quality_score as i64)
        .execute(&self.pool)
        .await?;

        debug!("Cached analysis data for {}", standardized_address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{DataTier, PropertySource, PropertyType};
    use std::collections::BTreeMap;

    fn mock_property() -> PropertyRecord {
        PropertyRecord {
            address: "350 Central Park West".to_string(),
            latitude: 40.7880,
            longitude: -73.9624,
            property_type: PropertyType::Condo,
            bedrooms: 2,
            bathrooms: 1.5,
            sqft: 1000,
            year_built: 1985,
            last_sale_price: 1_200_000.0,
            last_sale_date: None,
            source: PropertySource::Registry,
            quality: DataTier::High,
        }
    }

    fn mock_location() -> LocationFeatures {
        LocationFeatures {
            crime_score: 82.0,
            transit_score: 90.0,
            amenity_score: 75.0,
            walkability_score: 84.0,
            distance_to_subway: 0.2,
            distance_to_manhattan: 2.5,
            neighborhood: "Upper West Side".to_string(),
            amenity_counts: BTreeMap::new(),
            total_amenities: 24,
        }
    }

    #[tokio::test]
    async fn test_cache_round_trip() {
        let dir = std::env::temp_dir().join("nyc-analyzer-cache-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cache_round_trip.db");
        let _ = std::fs::remove_file(&path);

        let cache = AnalysisCache::open(&path).await.unwrap();
        assert!(cache.lookup("350 CENTRAL PARK W").await.unwrap().is_none());

        cache
            .store("350 CENTRAL PARK W", &mock_property(), &mock_location(), 78)
            .await
            .unwrap();

        let hit = cache.lookup("350 CENTRAL PARK W").await.unwrap().unwrap();
        assert_eq!(hit.property.bedrooms, 2);
        assert_eq!(hit.location.neighborhood, "Upper West Side");
        assert_eq!(hit.data_quality_score, 78);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_cache_replace_by_key() {
        let dir = std::env::temp_dir().join("nyc-analyzer-cache-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cache_replace.db");
        let _ = std::fs::remove_file(&path);

        let cache = AnalysisCache::open(&path).await.unwrap();
        cache
            .store("1 WALL ST", &mock_property(), &mock_location(), 50)
            .await
            .unwrap();
        cache
            .store("1 WALL ST", &mock_property(), &mock_location(), 90)
            .await
            .unwrap();

        let hit = cache.lookup("1 WALL ST").await.unwrap().unwrap();
        assert_eq!(hit.data_quality_score, 90);

        let _ = std::fs::remove_file(&path);
    }
}
