//! API error handling.

use std::time::Duration;

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Serialize;
use utoipa::ToSchema;

use crate::mailer::DeliveryError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Not found (404).
    NotFound,
    /// Per-client request throttle tripped (429).
    RateLimited,
    /// Hourly email quota used up (429).
    QuotaExceeded,
    /// Relay rejected the configured credentials (500).
    SmtpAuthFailed,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::RateLimited | ErrorCode::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::SmtpAuthFailed | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    retry_after: Option<u64>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Attach a `Retry-After` hint. Rounded up to whole seconds, at least 1.
    pub fn with_retry_after(mut self, after: Duration) -> Self {
        let secs = after.as_secs() + u64::from(after.subsec_nanos() > 0);
        self.retry_after = Some(secs.max(1));
        self
    }

    /// The error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a rate limited error.
    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::new(
            ErrorCode::RateLimited,
            "Too many requests. Please try again later.",
        )
        .with_retry_after(retry_after)
    }

    /// Create a quota exceeded error.
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::QuotaExceeded, message)
    }

    /// Create an SMTP authentication error.
    pub fn smtp_auth_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SmtpAuthFailed, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::QuotaExceeded { resets_at } => {
                let error = ApiError::quota_exceeded(
                    "Hourly email limit reached. Please try again later.",
                );
                match resets_at.and_then(|at| (at - Local::now()).to_std().ok()) {
                    Some(wait) => error.with_retry_after(wait),
                    None => error,
                }
            }
            DeliveryError::Authentication(detail) => {
                tracing::error!(error = %detail, "SMTP authentication failed");
                ApiError::smtp_auth_failed(
                    "SMTP authentication failed. Check the configured credentials.",
                )
            }
            DeliveryError::InvalidSender(detail) => {
                tracing::error!(error = %detail, "Sender address misconfigured");
                ApiError::internal("The configured sender address is invalid.")
            }
        }
    }
}
