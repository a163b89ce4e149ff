// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::backtrace::Backtrace;
use std::fmt;
use tracing::Span;

/// The only text a client ever sees for a 5xx.
pub const INTERNAL_ERROR: &str = "internal error";

/// Error envelope written on every failure path: `{"error": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse<'a> {
    pub error: &'a str,
}

/// HTTP API error. Client-facing messages are fixed strings; causes and
/// traces are only ever written to the log.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest {
        message: &'static str,
        cause: Option<String>,
    },

    // 401 Unauthorized
    Unauthorized {
        message: &'static str,
        cause: Option<String>,
    },

    // 403 Forbidden
    Forbidden { message: &'static str },

    // 500 Internal Server Error
    InternalServerError { detail: String, trace: String },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &'static str {
        match self {
            ApiError::BadRequest { message, .. } => message,
            ApiError::Unauthorized { message, .. } => message,
            ApiError::Forbidden { message } => message,
            ApiError::InternalServerError { .. } => INTERNAL_ERROR,
        }
    }

    pub fn to_json(&self) -> ErrorResponse<'static> {
        ErrorResponse {
            error: self.message(),
        }
    }

    /// Attach the underlying cause. Logged, never sent to the client.
    pub fn caused_by(mut self, err: impl fmt::Display) -> Self {
        match &mut self {
            ApiError::BadRequest { cause, .. } | ApiError::Unauthorized { cause, .. } => {
                *cause = Some(err.to_string());
            }
            ApiError::InternalServerError { detail, .. } => {
                *detail = format!("{}: {}", detail, err);
            }
            ApiError::Forbidden { .. } => {}
        }
        self
    }

    /// Log this error at error level under `span`, then build the response.
    pub fn respond(self, span: &Span) -> axum::response::Response {
        match &self {
            ApiError::InternalServerError { detail, trace } => {
                tracing::error!(parent: span, "{}\n{}", detail, trace);
            }
            ApiError::BadRequest { message, cause: Some(cause) }
            | ApiError::Unauthorized { message, cause: Some(cause) } => {
                tracing::error!(parent: span, error = %cause, "{}", message);
            }
            other => {
                tracing::error!(parent: span, "{}", other.message());
            }
        }

        (self.status_code(), Json(self.to_json())).into_response()
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: &'static str) -> Self {
        ApiError::BadRequest {
            message,
            cause: None,
        }
    }

    pub fn unauthorized(message: &'static str) -> Self {
        ApiError::Unauthorized {
            message,
            cause: None,
        }
    }

    pub fn forbidden(message: &'static str) -> Self {
        ApiError::Forbidden { message }
    }

    /// Internal failure with a stack trace captured here.
    pub fn internal_server_error(detail: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            detail: detail.into(),
            trace: Backtrace::force_capture().to_string(),
        }
    }

    /// Internal failure whose trace was captured elsewhere (e.g. at a panic site).
    pub fn internal_with_trace(detail: impl Into<String>, trace: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            detail: detail.into(),
            trace: trace.into(),
        }
    }
}

impl From<crate::services::ServiceError> for ApiError {
    fn from(err: crate::services::ServiceError) -> Self {
        ApiError::internal_server_error("service call failed").caused_by(err)
    }
}

// Standard error trait implementations
impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        self.respond(&Span::current())
    }
}
