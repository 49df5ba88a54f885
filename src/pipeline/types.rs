//! Core data types for the analysis pipeline
//! Pure data structures with no behavior beyond display/classification

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Quality tag attached to each data category of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataTier {
    High,
    Medium,
    Low,
    Simulated,
}

impl std::fmt::Display for DataTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataTier::High => write!(f, "high"),
            DataTier::Medium => write!(f, "medium"),
            DataTier::Low => write!(f, "low"),
            DataTier::Simulated => write!(f, "simulated"),
        }
    }
}

/// Where a property record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertySource {
    /// Matched against the NYC Department of Finance registry.
    Registry,
    /// Synthesized from neighborhood-tier distributions.
    Estimated,
    /// Fully simulated (geocoding also failed).
    Simulated,
}

impl std::fmt::Display for PropertySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertySource::Registry => write!(f, "NYC Department of Finance"),
            PropertySource::Estimated => write!(f, "Location-based estimation"),
            PropertySource::Simulated => write!(f, "Simulated"),
        }
    }
}

/// NYC residential property types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    Condo,
    #[serde(rename = "Co-op")]
    CoOp,
    Rental,
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyType::Condo => write!(f, "Condo"),
            PropertyType::CoOp => write!(f, "Co-op"),
            PropertyType::Rental => write!(f, "Rental"),
        }
    }
}

/// Coarse luxury classification of a neighborhood, used to parameterize
/// fallback property and rent estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarketTier {
    Luxury,
    MidTier,
    Affordable,
}

/// Geocoding result for an input address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
    pub quality: DataTier,
    /// Issues raised during coordinate cross-validation, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_issues: Vec<String>,
}

/// A resolved (or estimated) residential property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub property_type: PropertyType,
    pub bedrooms: u8,
    pub bathrooms: f64,
    pub sqft: u32,
    pub year_built: i32,
    pub last_sale_price: f64,
    pub last_sale_date: Option<NaiveDate>,
    pub source: PropertySource,
    pub quality: DataTier,
}

/// Per-coordinate location signals, all scores on a 0-100 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationFeatures {
    pub crime_score: f64,
    pub transit_score: f64,
    pub amenity_score: f64,
    pub walkability_score: f64,
    /// Miles to the nearest subway station.
    pub distance_to_subway: f64,
    /// Miles to the Manhattan center (Times Square).
    pub distance_to_manhattan: f64,
    pub neighborhood: String,
    pub amenity_counts: BTreeMap<String, u32>,
    pub total_amenities: u32,
}

/// A nearby rental listing used for market comparison only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalComparable {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub monthly_rent: f64,
    pub bedrooms: u8,
    pub bathrooms: f64,
    pub sqft: u32,
    pub distance_miles: f64,
    pub listing_source: String,
}

/// Output of the trained rent model for a single property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenuePrediction {
    pub predicted_monthly_rent: f64,
    pub confidence_interval: (f64, f64),
    pub annual_revenue: f64,
    pub annual_revenue_range: (f64, f64),
    pub model_r2: f64,
    pub model_rmse: f64,
    pub prediction_confidence: ConfidenceLevel,
}

/// Confidence labels used for predictions and data quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    None,
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "High"),
            ConfidenceLevel::Medium => write!(f, "Medium"),
            ConfidenceLevel::Low => write!(f, "Low"),
            ConfidenceLevel::None => write!(f, "None"),
        }
    }
}

/// Derived financial metrics for the investment case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub gross_rental_yield: f64,
    pub net_rental_yield: f64,
    pub estimated_annual_expenses: f64,
    pub net_annual_revenue: f64,
    pub monthly_cash_flow: f64,
    /// Percent difference of the predicted rent vs the mean comparable.
    pub rent_vs_comparables: f64,
    pub expense_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

impl RiskLevel {
    /// Classification is a pure function of the accumulated risk score.
    pub fn from_score(risk_score: i32) -> Self {
        if risk_score <= 1 {
            RiskLevel::Low
        } else if risk_score <= 3 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_factors: Vec<String>,
    pub overall_risk: RiskLevel,
    pub risk_score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "WEAK HOLD")]
    WeakHold,
    #[serde(rename = "AVOID")]
    Avoid,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::StrongBuy => write!(f, "STRONG BUY"),
            Recommendation::Buy => write!(f, "BUY"),
            Recommendation::Hold => write!(f, "HOLD"),
            Recommendation::WeakHold => write!(f, "WEAK HOLD"),
            Recommendation::Avoid => write!(f, "AVOID"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentRecommendation {
    pub recommendation: Recommendation,
    pub confidence: String,
    pub recommendation_score: i32,
}

/// Transparency summary of how much of the analysis relied on real
/// external data versus statistical fallback. Recomputed fresh for every
/// analysis, never cached or merged across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityAssessment {
    pub overall_score: u8,
    pub geocoding_quality: DataTier,
    pub property_quality: DataTier,
    pub location_quality: DataTier,
    pub rental_quality: DataTier,
    pub confidence_level: ConfidenceLevel,
    pub quality_issues: Vec<String>,
    pub data_sources_used: BTreeSet<String>,
    pub transparency_note: String,
}

/// Aggregate root for one `analyze` call. Immutable after construction;
/// each call owns its full data graph exclusively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentAnalysis {
    pub analysis_id: uuid::Uuid,
    pub property: PropertyRecord,
    pub location: LocationFeatures,
    pub rental_comparables: Vec<RentalComparable>,
    pub revenue_prediction: RevenuePrediction,
    pub financial_metrics: FinancialMetrics,
    pub risk_assessment: RiskAssessment,
    pub investment_recommendation: InvestmentRecommendation,
    pub data_quality: DataQualityAssessment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(2), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(3), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(4), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(10), RiskLevel::High);
    }

    #[test]
    fn test_recommendation_display() {
        assert_eq!(Recommendation::StrongBuy.to_string(), "STRONG BUY");
        assert_eq!(Recommendation::WeakHold.to_string(), "WEAK HOLD");
    }
}
