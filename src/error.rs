//! Domain-specific error types for ootd-engine

use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for the ootd-engine generation service
#[derive(Error, Debug)]
pub enum OotdError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Provider error: {message}")]
    Provider { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },

    #[error("Provider not configured: {message}")]
    NotConfigured { message: String },

    #[error("All image providers failed: {message}")]
    ImageChainExhausted { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for OotdError {
    fn from(err: anyhow::Error) -> Self {
        OotdError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for OotdError {
    fn from(err: serde_json::Error) -> Self {
        OotdError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for OotdError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OotdError::Timeout {
                operation: "provider request".to_string(),
                timeout_ms: 0,
            }
        } else {
            OotdError::Provider {
                message: format!("HTTP request failed: {}", err),
            }
        }
    }
}

impl OotdError {
    /// HTTP status to report for this error at the API boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            OotdError::Config { .. } | OotdError::NotConfigured { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            OotdError::InvalidParams { .. } => StatusCode::BAD_REQUEST,
            OotdError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            OotdError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            OotdError::ImageChainExhausted { .. } => StatusCode::BAD_GATEWAY,
            OotdError::Provider { .. }
            | OotdError::Serialization { .. }
            | OotdError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Map a provider HTTP status into a domain error with a truncated body excerpt.
/// 401/429/503 carry distinct meanings across the image providers (auth failure,
/// rate-limited, model loading) and keep those meanings in the message.
pub fn provider_http_error(status: u16, body: &str, context: &str) -> OotdError {
    let excerpt: String = body.chars().take(200).collect();
    let message = match status {
        401 => format!("{context}: invalid API key or insufficient permissions"),
        429 => format!("{context}: rate limit exceeded"),
        503 => format!("{context}: service unavailable or model loading"),
        _ => format!("{context}: upstream status {status}: {excerpt}"),
    };
    OotdError::Provider { message }
}

/// Result type alias for ootd-engine operations
pub type Result<T> = std::result::Result<T, OotdError>;
