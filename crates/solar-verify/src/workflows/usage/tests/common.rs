use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::usage::{InMemoryUsageStore, UsageService};

pub(super) const ADDRESS: &str = "homeowner@example.co.uk";
pub(super) const SESSION: &str = "203.0.113.7";

pub(super) fn usage_service() -> UsageService<InMemoryUsageStore> {
    UsageService::new(Arc::new(InMemoryUsageStore::default()))
}

pub(super) fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
