use crate::error::ExcelSchemaError;
use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;
use tracing::error;
use tracing::warn;

/// An error response: a status code and a `{"detail": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        ApiError {
            status,
            detail: detail.into(),
        }
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }

    pub fn internal(message: impl std::fmt::Display) -> Self {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("Error processing file: {message}"))
    }
}

impl From<ExcelSchemaError> for ApiError {
    fn from(error: ExcelSchemaError) -> Self {
        if error.is_invalid_input() {
            ApiError::new(StatusCode::BAD_REQUEST, error.to_string())
        } else {
            ApiError::internal(error)
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        // Oversized bodies surface here once the body limit trips.
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, error.body_text())
        } else {
            ApiError::unprocessable(error.body_text())
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::unprocessable(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, detail = %self.detail, "request failed");
        } else {
            warn!(status = %self.status, detail = %self.detail, "request rejected");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
