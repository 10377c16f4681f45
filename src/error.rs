//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Missing required header: {0}")]
    MissingHeader(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] crate::domain::DomainError),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::MissingHeader(header) => {
                (StatusCode::BAD_REQUEST, "missing_header", Some(header.clone()))
            }

            // 401 Unauthorized
            AppError::InvalidApiKey => {
                (StatusCode::UNAUTHORIZED, "invalid_api_key", None)
            }

            // 403 Forbidden
            AppError::PermissionDenied => {
                (StatusCode::FORBIDDEN, "permission_denied", None)
            }
            AppError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone()))
            }

            // 429 Too Many Requests
            AppError::RateLimitExceeded => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded", None)
            }

            // Domain errors - map each kind to an HTTP status
            AppError::Domain(ref domain_err) => {
                use crate::domain::DomainError;
                match domain_err {
                    DomainError::InvalidRequest(msg) => {
                        (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
                    }
                    DomainError::EventNotFound(id) => {
                        (StatusCode::NOT_FOUND, "event_not_found", Some(id.to_string()))
                    }
                    DomainError::TicketTypeNotFound(id) => {
                        (StatusCode::NOT_FOUND, "ticket_type_not_found", Some(id.to_string()))
                    }
                    DomainError::TicketNotFound(id) => {
                        (StatusCode::NOT_FOUND, "ticket_not_found", Some(id.to_string()))
                    }
                    DomainError::EventNotBookable { .. } => {
                        (StatusCode::CONFLICT, "event_not_bookable", Some(domain_err.to_string()))
                    }
                    DomainError::EventSoldOut => {
                        (StatusCode::CONFLICT, "event_sold_out", None)
                    }
                    DomainError::InsufficientAvailability { .. } => {
                        // Callers use the remaining count to offer a reduced quantity
                        (StatusCode::CONFLICT, "insufficient_availability", Some(domain_err.to_string()))
                    }
                    DomainError::PerRequestLimitExceeded { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "per_request_limit_exceeded", Some(domain_err.to_string()))
                    }
                    DomainError::PerUserLimitExceeded { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "per_user_limit_exceeded", Some(domain_err.to_string()))
                    }
                    DomainError::Unauthorized(msg) => {
                        (StatusCode::FORBIDDEN, "unauthorized", Some(msg.clone()))
                    }
                    DomainError::AlreadyFinalized { .. } => {
                        (StatusCode::CONFLICT, "already_finalized", Some(domain_err.to_string()))
                    }
                    DomainError::InvalidStatusTransition { .. } => {
                        (StatusCode::CONFLICT, "invalid_status_transition", Some(domain_err.to_string()))
                    }
                    DomainError::InvalidTransition { .. } => {
                        (StatusCode::CONFLICT, "invalid_transition", Some(domain_err.to_string()))
                    }
                    DomainError::ConcurrencyConflict => {
                        (StatusCode::CONFLICT, "concurrency_conflict", None)
                    }
                }
            }

            // 503 Service Unavailable - storage faults are not the caller's fault
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", None)
            }

            // 500 Internal Server Error
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(
            status_of(AppError::Domain(DomainError::EventNotFound(id))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Domain(DomainError::TicketNotFound(id))),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_availability_errors_map_to_409() {
        assert_eq!(
            status_of(AppError::Domain(DomainError::EventSoldOut)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Domain(DomainError::insufficient_availability(2, 1))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Domain(DomainError::ConcurrencyConflict)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_limit_errors_map_to_422() {
        assert_eq!(
            status_of(AppError::Domain(DomainError::PerRequestLimitExceeded {
                requested: 5,
                limit: 4
            })),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::Domain(DomainError::PerUserLimitExceeded {
                held: 3,
                requested: 2,
                limit: 4
            })),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_storage_faults_are_distinct_from_business_errors() {
        assert_eq!(
            status_of(AppError::Database(sqlx::Error::PoolClosed)),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
