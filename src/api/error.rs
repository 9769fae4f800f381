//! Error responses for the HTTP API.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::session::StoreError;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The store rejected the call.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The request body was absent or not valid JSON.
    #[error("Invalid request body: {}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::Validation(_)) => StatusCode::BAD_REQUEST,
            // Oversized bodies keep their 413; every other body problem is a 400.
            Self::InvalidBody(rejection) => {
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    StatusCode::PAYLOAD_TOO_LARGE
                } else {
                    StatusCode::BAD_REQUEST
                }
            }
            Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        }
    }
}

/// Failure body: `{"success": false, "message": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        warn!(
            name: "api.request.rejected",
            status = status.as_u16(),
            message = %message,
            "Request rejected"
        );

        let body = ErrorResponse {
            success: false,
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
