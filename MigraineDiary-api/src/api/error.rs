use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use migraine_diary_domain::services::ServiceError;

/// Error response format for API
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code - machine-readable identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("bad_request", message)
    }

    pub fn internal_error() -> Self {
        Self::new("internal_error", "An unexpected error occurred")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.as_str() {
            "validation_error" | "bad_request" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "payment_required" => StatusCode::PAYMENT_REQUIRED,
            "forbidden" => StatusCode::FORBIDDEN,
            "not_found" => StatusCode::NOT_FOUND,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ServiceError> for ErrorResponse {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => Self::new("validation_error", msg),
            ServiceError::NotFound(msg) => Self::new("not_found", msg),
            ServiceError::Conflict(msg) => Self::new("conflict", msg),
            ServiceError::Forbidden(msg) => Self::new("forbidden", msg),
            ServiceError::Unauthorized(msg) => Self::new("unauthorized", msg),
            ServiceError::PaymentRequired(msg) => {
                warn!("Upstream requires payment: {}", msg);
                Self::new("payment_required", "The AI provider has run out of credits")
            }
            ServiceError::RateLimited(msg) => {
                warn!("Upstream rate limit: {}", msg);
                Self::new("rate_limited", "Too many requests to the AI provider, try again later")
            }
            ServiceError::Upstream(msg) => {
                error!("Upstream failure: {}", msg);
                Self::new("upstream_error", "An external service failed")
            }
            ServiceError::Unavailable(msg) => Self::new("service_unavailable", msg),
            ServiceError::Repository(msg) | ServiceError::Internal(msg) => {
                error!("Internal error: {}", msg);
                Self::internal_error()
            }
        }
    }
}

// Extractor rejections keep the JSON error shape
impl From<JsonRejection> for ErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(&rejection.body_text())
    }
}

impl From<QueryRejection> for ErrorResponse {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(&rejection.body_text())
    }
}

/// Result type of every handler
pub type ApiResult<T> = Result<T, ErrorResponse>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ServiceError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::PaymentRequired("x".into()), StatusCode::PAYMENT_REQUIRED),
            (ServiceError::RateLimited("x".into()), StatusCode::TOO_MANY_REQUESTS),
            (ServiceError::Upstream("x".into()), StatusCode::BAD_GATEWAY),
            (ServiceError::Unavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (ServiceError::Repository("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ErrorResponse::from(err).status(), status);
        }
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let response = ErrorResponse::from(ServiceError::Repository("disk I/O error at /var/db".into()));
        assert_eq!(response.message, "An unexpected error occurred");
    }
}
