//! User-facing error taxonomy for the analysis entry points
//!
//! Collector failures (registry, crime, transit, amenities, comps) never
//! reach this level - they degrade to fallback generators inside the
//! pipeline. Only validation, geocoding and prediction problems surface.

use thiserror::Error;

/// Errors surfaced by the strict (validated) analysis entry point.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Address failed basic format checks before any external call.
    #[error("Invalid address format: {reason}")]
    InvalidAddressFormat {
        reason: String,
        example: String,
        suggestions: Vec<String>,
    },

    /// Address could not be resolved to coordinates.
    #[error("Could not geocode address '{address}'")]
    GeocodeMiss {
        address: String,
        suggestions: Vec<String>,
    },

    /// Geocoded coordinates failed cross-validation against the input.
    #[error("Address/coordinate mismatch: {details}")]
    CoordinateMismatch {
        details: String,
        suggested_address: Option<String>,
    },

    /// A required model feature was missing or out of range. Not
    /// recoverable via fallback - the model has no meaningful default
    /// for required fields.
    #[error("Revenue prediction failed: {0}")]
    Prediction(String),
}

impl AnalysisError {
    pub fn invalid_address(reason: impl Into<String>) -> Self {
        AnalysisError::InvalidAddressFormat {
            reason: reason.into(),
            example: "350 Central Park West, New York, NY".to_string(),
            suggestions: vec![
                "Include a street number".to_string(),
                "Include 'New York, NY' or a borough name".to_string(),
                "Check the spelling of the street name".to_string(),
            ],
        }
    }

    /// Remediation hints shown alongside the error message.
    pub fn suggestions(&self) -> &[String] {
        match self {
            AnalysisError::InvalidAddressFormat { suggestions, .. } => suggestions,
            AnalysisError::GeocodeMiss { suggestions, .. } => suggestions,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address_message() {
        let err = AnalysisError::invalid_address("address too short");
        assert!(err.to_string().contains("Invalid address format"));
        assert!(!err.suggestions().is_empty());
    }

    #[test]
    fn test_geocode_miss_message() {
        let err = AnalysisError::GeocodeMiss {
            address: "1 Nowhere Ln".to_string(),
            suggestions: vec!["Verify the address is in NYC".to_string()],
        };
        assert!(err.to_string().contains("1 Nowhere Ln"));
    }
}
