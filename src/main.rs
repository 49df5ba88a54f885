use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use nyc_property_analyzer::analyzer::{rank_opportunities, BatchSummary};
use nyc_property_analyzer::pipeline::types::InvestmentAnalysis;
use nyc_property_analyzer::{AnalysisError, Config, InvestmentAnalyzer};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
    analyzer: Arc<InvestmentAnalyzer>,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    address: String,
}

#[derive(Deserialize)]
struct BatchRequest {
    addresses: Vec<String>,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    success: bool,
    analysis: InvestmentAnalysis,
}

#[derive(Serialize)]
struct BatchResponse {
    success: bool,
    results: Vec<BatchSummary>,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suggestions: Vec<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    api_mode: String,
    model_r2: f64,
    version: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env();
    let api_mode = if config.is_demo() { "Demo Mode" } else { "Real API" };
    info!("Starting NYC property analyzer API ({})", api_mode);

    let analyzer = InvestmentAnalyzer::new(config)
        .await
        .expect("failed to initialize analyzer");

    let state = AppState {
        analyzer: Arc::new(analyzer),
    };

    let app = Router::new()
        .route("/", get(health_check))
        .route("/api/health", get(health_check))
        .route("/api/analyze", post(analyze_property))
        .route("/api/batch-analyze", post(batch_analyze))
        .route("/api/examples", get(get_examples))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3001));
    info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app).await.expect("server error");
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        api_mode: if Config::from_env().is_demo() {
            "Demo Mode".to_string()
        } else {
            "Real API".to_string()
        },
        model_r2: state.analyzer.model_metrics().r2,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn analyze_property(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, (StatusCode, Json<ErrorResponse>)> {
    let address = request.address.trim().to_string();
    if address.is_empty() {
        return Err(bad_request("Address is required", Vec::new()));
    }

    info!("Analyzing property: {}", address);

    match state.analyzer.analyze_property_validated(&address).await {
        Ok(analysis) => Ok(Json(AnalyzeResponse {
            success: true,
            analysis,
        })),
        Err(e @ AnalysisError::Prediction(_)) => {
            error!("Analysis failed for {}: {}", address, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    error: format!("Analysis failed: {e}"),
                    suggestions: Vec::new(),
                }),
            ))
        }
        Err(e) => Err(bad_request(&e.to_string(), e.suggestions().to_vec())),
    }
}

async fn batch_analyze(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.addresses.is_empty() {
        return Err(bad_request("At least one address is required", Vec::new()));
    }

    info!("Batch analyzing {} properties", request.addresses.len());
    let results = state.analyzer.batch_analyze(&request.addresses).await;

    Ok(Json(BatchResponse {
        success: true,
        results: rank_opportunities(results),
    }))
}

#[derive(Serialize)]
struct Example {
    address: &'static str,
    description: &'static str,
}

async fn get_examples() -> Json<serde_json::Value> {
    let examples = [
        Example {
            address: "350 Central Park West, New York, NY",
            description: "Upper West Side luxury building",
        },
        Example {
            address: "1 Wall Street, New York, NY",
            description: "Financial District historic building",
        },
        Example {
            address: "123 West 86th Street, New York, NY",
            description: "Upper West Side residential",
        },
        Example {
            address: "456 East 74th Street, New York, NY",
            description: "Upper East Side apartment",
        },
    ];

    Json(serde_json::json!({ "examples": examples }))
}

fn bad_request(
    message: &str,
    suggestions: Vec<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            success: false,
            error: message.to_string(),
            suggestions,
        }),
    )
}
