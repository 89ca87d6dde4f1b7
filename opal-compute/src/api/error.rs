//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opal_core::dto::job::ErrorResponse;

use crate::controller::ControllerError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    ServiceUnavailable(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        let message = err.to_string();
        match err {
            ControllerError::InvalidJobId | ControllerError::NotRunning => {
                ApiError::BadRequest(message)
            }
            ControllerError::Busy => ApiError::ServiceUnavailable(message),
            ControllerError::StartFailed(_) | ControllerError::CancelFailed(_) => {
                ApiError::InternalError(message)
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
