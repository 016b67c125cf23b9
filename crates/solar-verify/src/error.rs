use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::delivery::{MagicLinkError, TokenError};
use crate::workflows::quotes::QuoteAnalysisError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Analysis(QuoteAnalysisError),
    Delivery(MagicLinkError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Analysis(err) => write!(f, "analysis error: {}", err),
            AppError::Delivery(err) => write!(f, "delivery error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Analysis(err) => Some(err),
            AppError::Delivery(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Analysis(_) => StatusCode::BAD_REQUEST,
            AppError::Delivery(
                MagicLinkError::Address(_)
                | MagicLinkError::MissingSnapshot
                | MagicLinkError::Token(TokenError::Expired | TokenError::Invalid),
            ) => StatusCode::BAD_REQUEST,
            AppError::Delivery(MagicLinkError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<QuoteAnalysisError> for AppError {
    fn from(value: QuoteAnalysisError) -> Self {
        Self::Analysis(value)
    }
}

impl From<MagicLinkError> for AppError {
    fn from(value: MagicLinkError) -> Self {
        Self::Delivery(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::quotes::{QuoteField, QuoteValidationError};

    #[test]
    fn analysis_errors_map_to_bad_request() {
        let error = AppError::from(QuoteAnalysisError::from(QuoteValidationError::NonPositive(
            QuoteField::TotalPrice,
        )));
        assert_eq!(
            error.to_string(),
            "analysis error: Total price must be greater than 0"
        );
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn delivery_errors_keep_their_category() {
        let expired = AppError::from(MagicLinkError::from(TokenError::Expired));
        assert_eq!(expired.into_response().status(), StatusCode::BAD_REQUEST);

        let missing = AppError::from(MagicLinkError::NotFound);
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(io.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
