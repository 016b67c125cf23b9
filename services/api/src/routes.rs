use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use solar_verify::workflows::delivery::{
    magic_link_router, verification_code_router, AnalysisStore, CodeStore,
    CodeVerificationService, DeliveryGate, MagicLinkService, ReportMailer,
};
use solar_verify::workflows::quotes::{quote_router, BenchmarkSource, QuoteAnalysisService};
use solar_verify::workflows::usage::{usage_router, UsageService, UsageStore};
use std::sync::Arc;

/// Quote, magic-link, code and usage routers plus the operational endpoints.
pub(crate) fn with_api_routes<B, S, G, C, M, U>(
    quotes: Arc<QuoteAnalysisService<B>>,
    links: Arc<MagicLinkService<S, G, M>>,
    codes: Arc<CodeVerificationService<C, M>>,
    usage: Arc<UsageService<U>>,
) -> axum::Router
where
    B: BenchmarkSource + 'static,
    S: AnalysisStore + 'static,
    G: DeliveryGate + 'static,
    C: CodeStore + 'static,
    M: ReportMailer + 'static,
    U: UsageStore + 'static,
{
    quote_router(quotes)
        .merge(magic_link_router(links))
        .merge(verification_code_router(codes))
        .merge(usage_router(usage))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
