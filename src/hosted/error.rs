//! Error types for the hosted-repository client

use thiserror::Error;

/// Result type alias for hosted-service operations
pub type HostedResult<T> = Result<T, HostedError>;

/// Errors that can occur when talking to the hosted service
#[derive(Debug, Error)]
pub enum HostedError {
    /// HTTP request failed (connection, TLS, timeout)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("failed to parse response: {0}")]
    ParseError(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Credentials could not be loaded
    #[error("credentials unavailable: {0}")]
    Credentials(String),
}

impl HostedError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Whether the same request may succeed later: network faults, rate
    /// limits (403/429) and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) => true,
            Self::ApiError { status, .. } => matches!(*status, 403 | 429) || *status >= 500,
            Self::ParseError(_) | Self::NotFound(_) | Self::Credentials(_) => false,
        }
    }
}
