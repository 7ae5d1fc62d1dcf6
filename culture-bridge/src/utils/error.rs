use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_i18n::t;
use serde::Serialize;
use thiserror::Error;

use super::i18n::current_locale;

/// Errors raised while correlating the two handshake phases
///
/// Extraction misses are not errors: providers return `None` and the default
/// culture applies. Everything here fails the request.
#[derive(Error, Debug)]
pub enum ApiError {
    // Configuration errors 1xxx
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid culture: {0}")]
    InvalidCulture(String),

    // Protocol errors 2xxx
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    // Correlation state errors 3xxx
    #[error("Corrupted correlation cookie: {0}")]
    CorruptedCorrelationCookie(String),

    // System errors 5xxx
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn invalid_culture(name: impl Into<String>) -> Self {
        Self::InvalidCulture(name.into())
    }

    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation(message.into())
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    pub fn body_read(err: impl std::fmt::Display) -> Self {
        Self::BodyRead(err.to_string())
    }

    pub fn corrupted_cookie(err: impl std::fmt::Display) -> Self {
        Self::CorruptedCorrelationCookie(err.to_string())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    pub fn error_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1001,
            Self::InvalidCulture(_) => 1002,

            Self::ProtocolViolation(_) => 2001,
            Self::InvalidOperation(_) => 2002,
            Self::BodyRead(_) => 2003,

            Self::CorruptedCorrelationCookie(_) => 3001,

            Self::InternalError(_) => 5001,
            Self::Other(_) => 5001,
        }
    }

    /// Message rendered in the ambient culture of the failing request
    pub fn localized_message(&self) -> String {
        let locale = current_locale();
        match self {
            Self::Configuration(msg) => {
                t!("config.invalid", locale = &locale, message = msg).to_string()
            },
            Self::InvalidCulture(name) => {
                t!("culture.invalid", locale = &locale, name = name).to_string()
            },
            Self::ProtocolViolation(msg) => {
                t!("handshake.protocol_violation", locale = &locale, message = msg).to_string()
            },
            Self::InvalidOperation(msg) => {
                t!("handshake.invalid_operation", locale = &locale, message = msg).to_string()
            },
            Self::BodyRead(msg) => {
                t!("handshake.body_read", locale = &locale, message = msg).to_string()
            },
            Self::CorruptedCorrelationCookie(msg) => {
                t!("correlation.corrupted_cookie", locale = &locale, message = msg).to_string()
            },
            Self::InternalError(msg) => {
                t!("internal.error", locale = &locale, message = msg).to_string()
            },
            Self::Other(err) => {
                t!("internal.error", locale = &locale, message = err.to_string()).to_string()
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.error_code() {
            1001..=1999 => StatusCode::INTERNAL_SERVER_ERROR,
            2001..=2999 => StatusCode::BAD_REQUEST,
            3001..=3999 => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub code: i32,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!("Request failed: {}", self);

        let status = self.status_code();
        let response = ApiErrorResponse { code: self.error_code(), message: self.localized_message() };

        (status, Json(response)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal_error(format!("JSON serialization error: {}", err))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
