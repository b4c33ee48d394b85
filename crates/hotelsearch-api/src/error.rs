//! API error types and JSON error response formatting.
//!
//! ApiError provides a consistent JSON error response format across all
//! endpoints, mapping domain errors to HTTP status codes.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use hotelsearch_core::error::HotelSearchError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid parameters.
    BadRequest(String),
    /// 404 Not Found - record does not exist.
    NotFound(String),
    /// 500 Internal Server Error - inconsistent state or I/O failure.
    Internal(String),
    /// 503 Service Unavailable - the embedding service failed.
    ServiceUnavailable(String),
    /// 504 Gateway Timeout - the embedding service did not answer in time.
    GatewayTimeout(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_code, message) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg),
            ApiError::NotFound(msg) => ("not_found", msg),
            ApiError::Internal(msg) => ("internal_error", msg),
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg),
            ApiError::GatewayTimeout(msg) => ("gateway_timeout", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<HotelSearchError> for ApiError {
    fn from(err: HotelSearchError) -> Self {
        if err.is_embedder_error() {
            tracing::warn!(error = %err, "Embedding service failed while handling request");
        } else if !err.is_client_error() {
            tracing::error!(error = %err, "Internal error while handling request");
        }

        match err {
            HotelSearchError::Validation(msg) => ApiError::BadRequest(msg),
            HotelSearchError::NotFound(msg) => ApiError::NotFound(msg),
            HotelSearchError::Embedder(_) => ApiError::ServiceUnavailable(err.to_string()),
            HotelSearchError::EmbedderTimeout { .. } => ApiError::GatewayTimeout(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Malformed or mistyped JSON bodies get the same error shape as every
/// other client error.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_mapping() {
        let cases = [
            (HotelSearchError::Validation("q".into()), StatusCode::BAD_REQUEST),
            (HotelSearchError::NotFound("H1".into()), StatusCode::NOT_FOUND),
            (HotelSearchError::Embedder("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                HotelSearchError::EmbedderTimeout { timeout_ms: 10 },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                HotelSearchError::DimensionMismatch {
                    expected: 3,
                    actual: 2,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                HotelSearchError::Storage("poisoned".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_into_response_status() {
        let resp = ApiError::GatewayTimeout("slow".into()).into_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
