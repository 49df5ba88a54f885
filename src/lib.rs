//! NYC residential property investment analysis
//!
//! Given a free-text address this crate geocodes it, gathers property,
//! location and rental-market signals from real sources where available
//! (with transparent statistical fallbacks where not), predicts monthly
//! rental revenue with a regression model trained on synthetic market
//! data, and produces a financial and risk recommendation with an
//! explicit data-quality score.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;

pub use analyzer::InvestmentAnalyzer;
pub use config::Config;
pub use error::AnalysisError;

/// Gross rental yield percentage.
/// Formula: (annual_revenue / purchase_price) x 100
pub fn gross_rental_yield(annual_revenue: f64, purchase_price: f64) -> Option<f64> {
    if purchase_price <= 0.0 {
        return None;
    }
    Some(annual_revenue / purchase_price * 100.0)
}
