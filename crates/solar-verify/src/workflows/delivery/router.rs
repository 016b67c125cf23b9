use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::codes::{CodeVerificationError, CodeVerificationService};
use super::mailer::ReportMailer;
use super::service::{MagicLinkError, MagicLinkService};
use super::store::{AnalysisStore, CodeStore, DeliveryGate};
use super::token::{AnalysisSnapshot, TokenError};

#[derive(Debug, Deserialize)]
pub struct SendLinkRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "analysis_data")]
    pub analysis_snapshot: Option<AnalysisSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyLinkRequest {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub verification_code: Option<String>,
}

/// Router builder for magic-link issuance and verification.
pub fn magic_link_router<S, G, M>(service: Arc<MagicLinkService<S, G, M>>) -> Router
where
    S: AnalysisStore + 'static,
    G: DeliveryGate + 'static,
    M: ReportMailer + 'static,
{
    Router::new()
        .route("/api/send-link", post(send_link_handler::<S, G, M>))
        .route("/api/verify-link", post(verify_link_handler::<S, G, M>))
        .with_state(service)
}

/// Router builder for the numeric code variant.
pub fn verification_code_router<C, M>(service: Arc<CodeVerificationService<C, M>>) -> Router
where
    C: CodeStore + 'static,
    M: ReportMailer + 'static,
{
    Router::new()
        .route("/api/send-verification", post(send_code_handler::<C, M>))
        .route("/api/verify-email", post(verify_code_handler::<C, M>))
        .with_state(service)
}

pub(crate) async fn send_link_handler<S, G, M>(
    State(service): State<Arc<MagicLinkService<S, G, M>>>,
    axum::Json(request): axum::Json<SendLinkRequest>,
) -> Response
where
    S: AnalysisStore + 'static,
    G: DeliveryGate + 'static,
    M: ReportMailer + 'static,
{
    let email = request.email.unwrap_or_default();
    let result = match request.analysis_snapshot {
        Some(snapshot) => service.send_link(&email, snapshot).await,
        None => Err(MagicLinkError::MissingSnapshot),
    };

    match result {
        Ok(issued) => {
            let payload = json!({
                "message": "Check your email for a link to view your analysis",
                "expires_at": issued.expires_at,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => magic_link_error_response(error),
    }
}

pub(crate) async fn verify_link_handler<S, G, M>(
    State(service): State<Arc<MagicLinkService<S, G, M>>>,
    axum::Json(request): axum::Json<VerifyLinkRequest>,
) -> Response
where
    S: AnalysisStore + 'static,
    G: DeliveryGate + 'static,
    M: ReportMailer + 'static,
{
    let token = request.token.unwrap_or_default();
    match service.verify_link(&token).await {
        Ok(verified) => (StatusCode::OK, axum::Json(verified)).into_response(),
        Err(error) => magic_link_error_response(error),
    }
}

fn magic_link_error_response(error: MagicLinkError) -> Response {
    let status = match &error {
        MagicLinkError::Address(_)
        | MagicLinkError::MissingSnapshot
        | MagicLinkError::Token(TokenError::Expired | TokenError::Invalid) => {
            StatusCode::BAD_REQUEST
        }
        MagicLinkError::NotFound => StatusCode::NOT_FOUND,
        MagicLinkError::Token(TokenError::Encoding(_))
        | MagicLinkError::Store(_)
        | MagicLinkError::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn send_code_handler<C, M>(
    State(service): State<Arc<CodeVerificationService<C, M>>>,
    axum::Json(request): axum::Json<SendCodeRequest>,
) -> Response
where
    C: CodeStore + 'static,
    M: ReportMailer + 'static,
{
    let email = request.email.unwrap_or_default();
    match service.send_code(&email).await {
        Ok(issued) => {
            let payload = json!({
                "message": "Verification code sent",
                "expires_at": issued.expires_at,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => code_error_response(error),
    }
}

pub(crate) async fn verify_code_handler<C, M>(
    State(service): State<Arc<CodeVerificationService<C, M>>>,
    axum::Json(request): axum::Json<VerifyCodeRequest>,
) -> Response
where
    C: CodeStore + 'static,
    M: ReportMailer + 'static,
{
    let email = request.email.unwrap_or_default();
    let code = request.verification_code.unwrap_or_default();
    match service.verify_code(&email, &code) {
        Ok(()) => {
            let payload = json!({
                "message": "Email verified successfully",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => code_error_response(error),
    }
}

fn code_error_response(error: CodeVerificationError) -> Response {
    let status = match &error {
        CodeVerificationError::Address(_)
        | CodeVerificationError::MissingCode
        | CodeVerificationError::InvalidCode
        | CodeVerificationError::Expired => StatusCode::BAD_REQUEST,
        CodeVerificationError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        CodeVerificationError::Store(_) | CodeVerificationError::Delivery(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
