//! Analysis CLI - runs the full pipeline for one or more addresses

use anyhow::Result;
use nyc_property_analyzer::analyzer::rank_opportunities;
use nyc_property_analyzer::{report, Config, InvestmentAnalyzer};
use std::env;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    let addresses: Vec<String> = env::args().skip(1).collect();
    if addresses.is_empty() {
        eprintln!("Usage: analyze <address> [<address> ...]");
        eprintln!("Example: analyze \"350 Central Park West, New York, NY\"");
        std::process::exit(2);
    }

    let config = Config::from_env();
    if config.is_demo() {
        info!("No GOOGLE_MAPS_API_KEY configured - running in demo mode");
    }

    info!("Step 1/3: Initializing analyzer (training rent model)...");
    let analyzer = InvestmentAnalyzer::new(config).await?;
    let metrics = analyzer.model_metrics();
    info!(
        "Model ready: R2 = {:.3}, RMSE = ${:.0}",
        metrics.r2, metrics.rmse
    );

    if addresses.len() == 1 {
        info!("Step 2/3: Analyzing property...");
        match analyzer.analyze_property_validated(&addresses[0]).await {
            Ok(analysis) => {
                info!("Step 3/3: Rendering report...");
                println!("{}", report::render(&analysis));
            }
            Err(e) => {
                error!("{}", e);
                for suggestion in e.suggestions() {
                    error!("  hint: {}", suggestion);
                }
                std::process::exit(1);
            }
        }
    } else {
        info!("Step 2/3: Batch analyzing {} properties...", addresses.len());
        let results = analyzer.batch_analyze(&addresses).await;
        if results.is_empty() {
            error!("No properties analyzed successfully");
            std::process::exit(1);
        }

        info!("Step 3/3: Ranking opportunities...");
        let ranked = rank_opportunities(results);

        println!(
            "{:<4} {:<42} {:>10} {:>8} {:>8} {:>7} {:>12}",
            "Rank", "Address", "Rent", "Yield", "Risk", "Quality", "Recommendation"
        );
        for summary in &ranked {
            println!(
                "{:<4} {:<42} {:>10.0} {:>7.2}% {:>8} {:>6}/100 {:>12}",
                summary.rank.unwrap_or(0),
                truncate(&summary.address, 42),
                summary.predicted_monthly_rent,
                summary.gross_yield,
                summary.overall_risk.to_string(),
                summary.data_quality_score,
                summary.recommendation.to_string(),
            );
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
