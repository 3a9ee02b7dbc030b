use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::assessments::orchestrator::SuggestionError;
use crate::assessments::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Suggestion(#[from] SuggestionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid request body: {0}")]
    Body(#[from] JsonRejection),

    #[error("Invalid query: {0}")]
    Query(#[from] QueryRejection),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut extra: Option<(&str, Value)> = None;

        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Suggestion(e) => match e {
                SuggestionError::Configuration { missing } => {
                    tracing::error!("Configuration error: missing {}", missing.join(", "));
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "CONFIGURATION_ERROR",
                        "The suggestion service is not configured".to_string(),
                    )
                }
                SuggestionError::InvalidRequest(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                SuggestionError::RateLimited => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMITED",
                    "Rate limit exceeded. Please try again later.".to_string(),
                ),
                SuggestionError::PaymentRequired => (
                    StatusCode::PAYMENT_REQUIRED,
                    "PAYMENT_REQUIRED",
                    "Payment required. Please add credits to continue.".to_string(),
                ),
                SuggestionError::Provider { status, body } => {
                    tracing::error!("AI gateway error: {status:?} {body}");
                    let message = match status {
                        Some(status) => format!("AI Gateway error: {status}"),
                        None => "AI Gateway could not be reached".to_string(),
                    };
                    (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message)
                }
                SuggestionError::MalformedSuggestion(_) => (
                    StatusCode::BAD_GATEWAY,
                    "MALFORMED_SUGGESTION",
                    "The AI returned an unexpected response. Please try again.".to_string(),
                ),
                SuggestionError::Persistence {
                    source,
                    suggestions,
                } => {
                    tracing::error!("Persistence error: {source}");
                    extra = Some((
                        "suggestions",
                        serde_json::to_value(&**suggestions).unwrap_or(Value::Null),
                    ));
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "PERSISTENCE_ERROR",
                        "Suggestions were generated but could not be saved".to_string(),
                    )
                }
            },
            AppError::Body(rejection) => {
                (rejection.status(), "VALIDATION_ERROR", rejection.body_text())
            }
            AppError::Query(rejection) => {
                (rejection.status(), "VALIDATION_ERROR", rejection.body_text())
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some((key, value)) = extra {
            error[key] = value;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
