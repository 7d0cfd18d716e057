use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::limits::abuse::AbuseBlock;
use crate::limits::quota::QuotaDenial;
use crate::llm_client::LlmError;
use crate::store::StoreError;

pub const LOGIN_REQUIRED_MESSAGE: &str = "Please sign in to use this feature.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// The three admission denials render the flat `{error: "<kind>", ...}`
/// envelopes clients branch on; everything else uses `{error: {code, message}}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Login required")]
    LoginRequired,

    #[error("Feature unavailable on plan: {0}")]
    FeatureUnavailable(String),

    #[error("Free device daily limit reached")]
    AbuseBlocked(AbuseBlock),

    #[error("Quota exceeded for {}", .0.feature)]
    QuotaExceeded(QuotaDenial),

    #[error("Upstream AI error: {0}")]
    Upstream(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Parse(e) => {
                AppError::Internal(anyhow::anyhow!("model returned malformed JSON: {e}"))
            }
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::LoginRequired => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "login_required",
                        "message": LOGIN_REQUIRED_MESSAGE,
                    })),
                )
                    .into_response();
            }
            AppError::AbuseBlocked(block) => {
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "error": "too_many_free_accounts",
                        "message": block.message,
                    })),
                )
                    .into_response();
            }
            AppError::QuotaExceeded(denial) => {
                return (
                    StatusCode::PAYMENT_REQUIRED,
                    Json(json!({
                        "error": "quota_exceeded",
                        "feature": denial.feature,
                        "limit": denial.limit,
                        "period_kind": denial.period_kind,
                        "period_key": denial.period_key,
                        "message": denial.message,
                    })),
                )
                    .into_response();
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::FeatureUnavailable(feature) => (
                StatusCode::FORBIDDEN,
                "FEATURE_UNAVAILABLE",
                format!("{feature} is not included in your plan"),
            ),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream AI error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_AI_ERROR",
                    "The AI service is unavailable, please retry".to_string(),
                )
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
