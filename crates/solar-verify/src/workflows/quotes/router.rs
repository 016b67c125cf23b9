use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::benchmark::BenchmarkSource;
use super::domain::QuoteInput;
use super::service::{QuoteAnalysisError, QuoteAnalysisService};

/// Router builder exposing quote analysis and benchmark endpoints.
pub fn quote_router<B>(service: Arc<QuoteAnalysisService<B>>) -> Router
where
    B: BenchmarkSource + 'static,
{
    Router::new()
        .route("/api/analyze-quote", post(analyze_handler::<B>))
        .route("/api/battery-options", get(battery_options_handler::<B>))
        .route("/api/pricing-benchmarks", get(pricing_benchmarks_handler::<B>))
        .with_state(service)
}

pub(crate) async fn analyze_handler<B>(
    State(service): State<Arc<QuoteAnalysisService<B>>>,
    Json(input): Json<QuoteInput>,
) -> Response
where
    B: BenchmarkSource + 'static,
{
    match service.analyze_tracked(input) {
        Ok(analysis) => (StatusCode::OK, Json(analysis)).into_response(),
        Err(QuoteAnalysisError::Validation(error)) => {
            let payload = json!({
                "error": error.to_string(),
                "missing_fields": error.fields(),
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn battery_options_handler<B>(
    State(service): State<Arc<QuoteAnalysisService<B>>>,
) -> Response
where
    B: BenchmarkSource + 'static,
{
    let payload = json!({ "battery_options": service.battery_options() });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn pricing_benchmarks_handler<B>(
    State(service): State<Arc<QuoteAnalysisService<B>>>,
) -> Response
where
    B: BenchmarkSource + 'static,
{
    (StatusCode::OK, Json(service.pricing_benchmarks())).into_response()
}
