//! Error types for autocloud.

use thiserror::Error;

/// Result type alias for API operations.
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Failure reported by the HTTP transport.
///
/// `status` carries the HTTP status code when the server answered with a
/// non-2xx response. It is `None` for network failures and for responses
/// that could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", describe(.status, .message))]
pub struct ApiError {
    /// HTTP status code, if the server responded.
    pub status: Option<u16>,
    /// Human readable message, taken from the error body when available.
    pub message: String,
}

impl ApiError {
    /// Message used when an error response carries no `message` field.
    pub const UNEXPECTED_RESPONSE: &'static str = "Unexpected response";

    /// Creates an error for a non-2xx HTTP response.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a status-less error (network failure, undecodable body).
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Returns true if the server rejected the request itself (status < 500).
    ///
    /// Retrying such a request without changing it cannot succeed.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status.is_some_and(|status| status < 500)
    }

    /// Returns true if the failure is transient (status >= 500 or no status).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !self.is_client_error()
    }
}

fn describe(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("HTTP {status}: {message}"),
        None => message.to_string(),
    }
}

/// Errors surfaced to a tracking sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// Fetching job events failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A pushed message was not valid JSON or not a valid job event.
    #[error("Error parsing event data: {0}")]
    Parse(String),

    /// The push channel reported an error.
    #[error("Push channel error: {0}")]
    Channel(String),

    /// The background task driving a session failed.
    #[error("Tracking task failed: {0}")]
    Task(String),
}

impl TrackError {
    /// Returns the HTTP status code behind this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => err.status,
            _ => None,
        }
    }
}
