//! Error handling for the FOLIO HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest { message: String, code: String },

    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error(transparent)]
    Store(#[from] sqlx::Error),

    #[error(transparent)]
    ObjectStore(#[from] folio_objstore::ObjectStoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: "bad_request".to_string(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let timestamp = OffsetDateTime::now_utc().to_string();

        // Downstream failures (relational store, object store, anything
        // internal) answer with a fixed generic body; the concrete error
        // stays in the logs under the generated error id.
        let (status, code, message) = match &self {
            AppError::BadRequest { message, code } => {
                (StatusCode::BAD_REQUEST, code.clone(), message.clone())
            }
            AppError::NotFound { message, code } => {
                (StatusCode::NOT_FOUND, code.clone(), message.clone())
            }
            AppError::Store(_) | AppError::ObjectStore(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error".to_string(),
                "an internal server error occurred".to_string(),
            ),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error_id = %error_id, error = ?self, "request failed");
        } else {
            tracing::warn!(
                error_id = %error_id,
                error_code = %code,
                status_code = status.as_u16(),
                "request rejected"
            );
        }

        let error_response = json!({
            "error": {
                "code": code,
                "message": message,
                "trace_id": error_id.to_string(),
                "timestamp": timestamp
            }
        });

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn bad_request_maps_to_400() {
        let error = AppError::bad_request("image file is required");
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let error = AppError::not_found("book not found");
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_error_maps_to_500() {
        let error = AppError::from(sqlx::Error::PoolTimedOut);
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_error_maps_to_500() {
        let internal = anyhow::anyhow!("database connection failed");
        let error = AppError::Internal(internal);
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
