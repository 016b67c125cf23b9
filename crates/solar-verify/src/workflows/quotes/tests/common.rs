use std::sync::Arc;

use axum::response::Response;
use axum::Router;
use serde_json::Value;

use crate::workflows::quotes::{
    quote_router, CostAllocator, QuoteAnalysisService, QuoteInput, Ruleset, SolarCostFallback,
    StaticBenchmarks, ValidatedQuote, VerdictCategory, VerdictEngine,
};

pub(super) fn ruleset() -> Ruleset {
    Ruleset::uk_2025()
}

pub(super) fn engine() -> VerdictEngine {
    VerdictEngine::new(CostAllocator::new(SolarCostFallback::default()))
}

pub(super) fn share_engine() -> VerdictEngine {
    VerdictEngine::new(CostAllocator::new(SolarCostFallback::ShareOfTotal))
}

/// Canonical tables with unlisted batteries priced at `per_kwh`.
pub(super) fn storage_priced_at(per_kwh: f64) -> Ruleset {
    Ruleset {
        custom_battery_per_kwh: per_kwh,
        ..ruleset()
    }
}

pub(super) fn other_battery_quote(total_price: f64, capacity_kwh: f64) -> QuoteInput {
    QuoteInput::solar_only(4.0, total_price).with_battery("other", 1, Some(capacity_kwh))
}

pub(super) fn validated(input: &QuoteInput) -> ValidatedQuote {
    input.validate().expect("valid quote")
}

pub(super) fn powerwall_quote(system_size_kw: f64, total_price: f64) -> QuoteInput {
    QuoteInput::solar_only(system_size_kw, total_price).with_battery("tesla-powerwall-3", 1, None)
}

pub(super) fn build_service() -> Arc<QuoteAnalysisService<StaticBenchmarks>> {
    Arc::new(QuoteAnalysisService::new(
        Arc::new(StaticBenchmarks::default()),
        SolarCostFallback::default(),
    ))
}

pub(super) fn router() -> Router {
    quote_router(build_service())
}

/// Underpriced reads as the cheapest outcome, overpriced as the most expensive.
pub(super) fn price_order(category: VerdictCategory) -> u8 {
    match category {
        VerdictCategory::Underpriced => 0,
        VerdictCategory::GoodValue => 1,
        VerdictCategory::Overpriced => 2,
        VerdictCategory::Incomplete => u8::MAX,
    }
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
