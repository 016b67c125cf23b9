use super::common::*;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::workflows::quotes::router::analyze_handler;
use crate::workflows::quotes::{QuoteInput, StaticBenchmarks};

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn analyze_handler_rejects_missing_fields() {
    let response = analyze_handler::<StaticBenchmarks>(
        State(build_service()),
        axum::Json(QuoteInput {
            total_price: None,
            ..QuoteInput::solar_only(4.0, 1.0)
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["missing_fields"], json!(["total_price"]));
}

#[tokio::test]
async fn analyze_route_accepts_string_numbers_and_legacy_aliases() {
    let response = router()
        .oneshot(post_json(
            "/api/analyze-quote",
            json!({
                "system_size": "4",
                "total_price": "3200",
                "has_battery": false,
                "battery_quantity": "",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["verdict"]["category"], "UNDERPRICED");
    assert_eq!(body["verdict"]["grade"], "A+");
    assert_eq!(body["quote"]["system_size_kw"], json!(4.0));
    assert_eq!(body["breakdown"]["price_per_kwp"], json!(800.0));
}

#[tokio::test]
async fn analyze_route_prices_battery_quotes() {
    let response = router()
        .oneshot(post_json(
            "/api/analyze-quote",
            json!({
                "system_size_kw": 5,
                "total_price": 15000,
                "has_battery": true,
                "battery_brand": "tesla-powerwall-3",
                "battery_quantity": 1,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["verdict"]["category"], "GOOD_VALUE");
    assert_eq!(body["breakdown"]["battery_estimate"]["method"], "catalogue");
    assert_eq!(body["quote"]["battery_label"], "Tesla Powerwall 3 (13.5kWh)");
}

#[tokio::test]
async fn analyze_route_rejects_zero_system_size() {
    let response = router()
        .oneshot(post_json(
            "/api/analyze-quote",
            json!({ "system_size_kw": 0, "total_price": 5000 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "System size must be greater than 0");
}

#[tokio::test]
async fn analyze_route_rejects_overflowing_prices() {
    let response = router()
        .oneshot(post_json(
            "/api/analyze-quote",
            json!({ "system_size_kw": 0.5, "total_price": 1e308 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "Quote values are too large to price");
    assert_eq!(body["missing_fields"], json!([]));
}

#[tokio::test]
async fn battery_options_end_with_custom_entry() {
    let response = router()
        .oneshot(
            Request::get("/api/battery-options")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let options = body["battery_options"].as_array().expect("options array");
    assert!(options.len() > 1);
    assert_eq!(options.last().map(|option| &option["id"]), Some(&json!("other")));
}

#[tokio::test]
async fn pricing_benchmarks_expose_active_ruleset() {
    let response = router()
        .oneshot(
            Request::get("/api/pricing-benchmarks")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["ruleset"], "uk-2025");
    assert_eq!(body["solar_tiers"][0]["grade"], "A+");
    assert_eq!(body["installers"].as_array().map(Vec::len), Some(3));
}
