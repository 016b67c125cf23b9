use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::quotes::{
    quote_router, QuoteAnalysisService, QuoteInput, SolarCostFallback, StaticBenchmarks,
};
use crate::workflows::usage::usage_router;

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn register_then_status_reports_the_allowance() {
    let router = usage_router(Arc::new(usage_service()));

    let registered = router
        .clone()
        .oneshot(post_json(
            "/api/register-email",
            json!({ "email": ADDRESS, "user_id": SESSION }),
        ))
        .await
        .unwrap();
    assert_eq!(registered.status(), StatusCode::OK);
    let body = read_json_body(registered).await;
    assert_eq!(body["user"]["free_checks_remaining"], 3);
    assert_eq!(body["user"]["can_use_free"], true);

    let status = router
        .oneshot(post_json("/api/check-email-status", json!({ "email": ADDRESS })))
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    let body = read_json_body(status).await;
    assert_eq!(body["registered"], true);
    assert_eq!(body["user"]["email"], ADDRESS);
    assert_eq!(body["user"]["total_analyses"], 0);
}

#[tokio::test]
async fn status_of_unknown_address_omits_user() {
    let response = usage_router(Arc::new(usage_service()))
        .oneshot(post_json("/api/check-email-status", json!({ "email": ADDRESS })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["registered"], false);
    assert!(body.get("user").is_none());
}

#[tokio::test]
async fn register_rejects_invalid_addresses() {
    let router = usage_router(Arc::new(usage_service()));

    for payload in [json!({}), json!({ "email": "nobody" })] {
        let response = router
            .clone()
            .oneshot(post_json("/api/register-email", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn track_usage_reports_new_requesters() {
    let response = usage_router(Arc::new(usage_service()))
        .oneshot(post_json("/api/track-usage", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["usage"]["type"], "new");
    assert_eq!(body["usage"]["checks_limit"], 1);
}

#[tokio::test]
async fn analyses_with_a_requester_feed_usage_tracking() {
    let usage = Arc::new(usage_service());
    let quotes = QuoteAnalysisService::new(
        Arc::new(StaticBenchmarks::default()),
        SolarCostFallback::default(),
    )
    .with_usage(usage.clone());
    let router = quote_router(Arc::new(quotes)).merge(usage_router(usage));

    let mut input = QuoteInput::solar_only(4.0, 6000.0);
    input.user_email = Some(SESSION.to_string());
    for expected in 1..=2 {
        let response = router
            .clone()
            .oneshot(post_json("/api/analyze-quote", json!(input)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(body["analysis_count"], expected);
        assert!(body["verdict"]["grade"].is_string());
    }

    let anonymous = router
        .clone()
        .oneshot(post_json(
            "/api/analyze-quote",
            json!(QuoteInput::solar_only(4.0, 6000.0)),
        ))
        .await
        .unwrap();
    let body = read_json_body(anonymous).await;
    assert!(body.get("analysis_count").is_none());

    let tracked = router
        .oneshot(post_json("/api/track-usage", json!({ "user_id": SESSION })))
        .await
        .unwrap();
    let body = read_json_body(tracked).await;
    assert_eq!(body["usage"]["type"], "anonymous");
    assert_eq!(body["usage"]["checks_used"], 2);
    assert_eq!(body["usage"]["needs_email"], true);
}
