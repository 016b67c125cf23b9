use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::service::{UsageError, UsageService};
use super::store::UsageStore;

#[derive(Debug, Deserialize)]
pub struct TrackUsageRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterEmailRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailStatusRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Router builder for usage tracking and e-mail registration.
pub fn usage_router<U>(service: Arc<UsageService<U>>) -> Router
where
    U: UsageStore + 'static,
{
    Router::new()
        .route("/api/track-usage", post(track_usage_handler::<U>))
        .route("/api/register-email", post(register_email_handler::<U>))
        .route("/api/check-email-status", post(email_status_handler::<U>))
        .with_state(service)
}

pub(crate) async fn track_usage_handler<U>(
    State(service): State<Arc<UsageService<U>>>,
    Json(request): Json<TrackUsageRequest>,
) -> Response
where
    U: UsageStore + 'static,
{
    match service.check_limits(request.user_id.as_deref(), request.email.as_deref()) {
        Ok(usage) => {
            let payload = json!({ "success": true, "usage": usage });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => usage_error_response(error),
    }
}

pub(crate) async fn register_email_handler<U>(
    State(service): State<Arc<UsageService<U>>>,
    Json(request): Json<RegisterEmailRequest>,
) -> Response
where
    U: UsageStore + 'static,
{
    let email = request.email.unwrap_or_default();
    match service.register_email(&email, request.user_id) {
        Ok(user) => {
            let payload = json!({
                "success": true,
                "message": "Email registered successfully",
                "user": user,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => usage_error_response(error),
    }
}

pub(crate) async fn email_status_handler<U>(
    State(service): State<Arc<UsageService<U>>>,
    Json(request): Json<EmailStatusRequest>,
) -> Response
where
    U: UsageStore + 'static,
{
    let email = request.email.unwrap_or_default();
    match service.email_status(&email) {
        Ok(status) => {
            let mut payload = json!({ "success": true, "registered": status.registered });
            if let Some(user) = status.user {
                payload["user"] = json!(user);
            }
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => usage_error_response(error),
    }
}

fn usage_error_response(error: UsageError) -> Response {
    let status = match &error {
        UsageError::Address(_) => StatusCode::BAD_REQUEST,
        UsageError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
