//! Plain-text investment report rendering

use crate::pipeline::types::InvestmentAnalysis;
use std::fmt::Write;

const RULE: &str = "===================================================================";
const LINE: &str = "-------------------------------------------------------------------";

/// Render a detailed text report for one analysis.
pub fn render(analysis: &InvestmentAnalysis) -> String {
    let prop = &analysis.property;
    let loc = &analysis.location;
    let rev = &analysis.revenue_prediction;
    let fin = &analysis.financial_metrics;
    let risk = &analysis.risk_assessment;
    let rec = &analysis.investment_recommendation;
    let quality = &analysis.data_quality;

    let market_position = if fin.rent_vs_comparables > 5.0 {
        "Above Market"
    } else if fin.rent_vs_comparables > -5.0 {
        "At Market"
    } else {
        "Below Market"
    };

    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "            NYC PROPERTY INVESTMENT ANALYSIS REPORT");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);
    let _ = writeln!(out, "PROPERTY OVERVIEW");
    let _ = writeln!(out, "{LINE}");
    let _ = writeln!(out, "Address:           {}", prop.address);
    let _ = writeln!(out, "Property Type:     {}", prop.property_type);
    let _ = writeln!(out, "Bedrooms:          {}", prop.bedrooms);
    let _ = writeln!(out, "Bathrooms:         {:.1}", prop.bathrooms);
    let _ = writeln!(out, "Square Feet:       {}", prop.sqft);
    let _ = writeln!(out, "Year Built:        {}", prop.year_built);
    let _ = writeln!(out, "Last Sale Price:   ${:.0}", prop.last_sale_price);
    let _ = writeln!(out, "Neighborhood:      {}", loc.neighborhood);
    let _ = writeln!(out);
    let _ = writeln!(out, "FINANCIAL PROJECTIONS");
    let _ = writeln!(out, "{LINE}");
    let _ = writeln!(
        out,
        "Predicted Monthly Rent:    ${:.0}",
        rev.predicted_monthly_rent
    );
    let _ = writeln!(
        out,
        "Confidence Range:          ${:.0} - ${:.0}",
        rev.confidence_interval.0, rev.confidence_interval.1
    );
    let _ = writeln!(out, "Annual Revenue:            ${:.0}", rev.annual_revenue);
    let _ = writeln!(out, "Gross Rental Yield:        {:.2}%", fin.gross_rental_yield);
    let _ = writeln!(out, "Net Rental Yield:          {:.2}%", fin.net_rental_yield);
    let _ = writeln!(out, "Monthly Cash Flow:         ${:.0}", fin.monthly_cash_flow);
    let _ = writeln!(out, "Expense Ratio:             {:.1}%", fin.expense_ratio);
    let _ = writeln!(out);
    let _ = writeln!(out, "MARKET COMPARISON");
    let _ = writeln!(out, "{LINE}");
    let _ = writeln!(
        out,
        "Rent vs. Comparables:      {:+.1}%",
        fin.rent_vs_comparables
    );
    let _ = writeln!(out, "Market Position:           {market_position}");
    let _ = writeln!(
        out,
        "Prediction Confidence:     {}",
        rev.prediction_confidence
    );
    let _ = writeln!(
        out,
        "Rental Comparables:        {} found",
        analysis.rental_comparables.len()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "LOCATION ANALYSIS (scores out of 100)");
    let _ = writeln!(out, "{LINE}");
    let _ = writeln!(out, "Crime Score:               {:.0}/100", loc.crime_score);
    let _ = writeln!(out, "Walkability Score:         {:.0}/100", loc.walkability_score);
    let _ = writeln!(out, "Transit Score:             {:.0}/100", loc.transit_score);
    let _ = writeln!(out, "Amenity Score:             {:.0}/100", loc.amenity_score);
    let _ = writeln!(out, "Distance to Subway:        {:.1} miles", loc.distance_to_subway);
    let _ = writeln!(
        out,
        "Distance to Manhattan:     {:.1} miles",
        loc.distance_to_manhattan
    );
    let _ = writeln!(out, "Total Nearby Amenities:    {}", loc.total_amenities);
    let _ = writeln!(out);
    let _ = writeln!(out, "RISK ASSESSMENT");
    let _ = writeln!(out, "{LINE}");
    let _ = writeln!(out, "Overall Risk Level:        {}", risk.overall_risk);
    let _ = writeln!(
        out,
        "Risk Factors:              {}",
        if risk.risk_factors.is_empty() {
            "None identified".to_string()
        } else {
            risk.risk_factors.join(", ")
        }
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "INVESTMENT RECOMMENDATION");
    let _ = writeln!(out, "{LINE}");
    let _ = writeln!(out, "Recommendation:            {}", rec.recommendation);
    let _ = writeln!(out, "Confidence Level:          {}", rec.confidence);
    let _ = writeln!(out);
    let _ = writeln!(out, "DATA QUALITY ASSESSMENT");
    let _ = writeln!(out, "{LINE}");
    let _ = writeln!(
        out,
        "Overall Data Quality:      {}/100",
        quality.overall_score
    );
    let _ = writeln!(out, "Geocoding Quality:         {}", quality.geocoding_quality);
    let _ = writeln!(out, "Property Data Quality:     {}", quality.property_quality);
    let _ = writeln!(out, "Location Data Quality:     {}", quality.location_quality);
    let _ = writeln!(out, "Rental Data Quality:       {}", quality.rental_quality);
    let _ = writeln!(
        out,
        "Data Sources:              {}",
        quality
            .data_sources_used
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );
    let _ = writeln!(out, "Note:                      {}", quality.transparency_note);
    if !quality.quality_issues.is_empty() {
        let _ = writeln!(out, "Issues:                    {}", quality.quality_issues.join("; "));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "MODEL PERFORMANCE");
    let _ = writeln!(out, "{LINE}");
    let _ = writeln!(out, "Model Accuracy (R2):       {:.3}", rev.model_r2);
    let _ = writeln!(out, "Prediction RMSE:           ${:.0}", rev.model_rmse);
    let _ = writeln!(out);
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "DISCLAIMER: This analysis is based on algorithmic predictions and\n\
         available market data. Data quality: {}/100. Consult with real\n\
         estate professionals and conduct thorough due diligence before\n\
         making investment decisions.",
        quality.overall_score
    );
    let _ = writeln!(out, "{RULE}");

    out
}
