use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pixelboard_core::{CooldownStatus, PlacementError, RejectReason};
use serde_json::json;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Cooldown active")]
    CooldownActive(CooldownStatus),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PlacementError> for AppError {
    fn from(err: PlacementError) -> Self {
        match err {
            PlacementError::CooldownActive(status) => AppError::CooldownActive(status),
            PlacementError::InvalidRequest(msg) => AppError::BadRequest(msg),
            PlacementError::Aborted(msg) => AppError::Unavailable(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "reason": RejectReason::InvalidRequest,
                    "message": msg,
                }),
            ),
            AppError::CooldownActive(cooldown) => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "success": false,
                    "reason": RejectReason::CooldownActive,
                    "message": format!(
                        "Please wait {} more second(s) before placing another pixel",
                        cooldown.remaining_seconds
                    ),
                    "remainingSeconds": cooldown.remaining_seconds,
                    "remainingMinutes": cooldown.remaining_minutes,
                }),
            ),
            AppError::Unavailable(msg) => {
                tracing::warn!("Request aborted: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "success": false, "error": "Canvas is busy, try again" }),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
