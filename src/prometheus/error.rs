//! Error types for the Prometheus client

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use super::result::ValueType;

/// Result type alias for Prometheus operations
pub type PrometheusResult<T> = Result<T, PrometheusError>;

/// Error category, as reported in the `errorType` field of an API response or
/// derived from the HTTP status code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ErrorType {
    Timeout,
    Canceled,
    Execution,
    BadData,
    Internal,
    Unavailable,
    NotFound,
    BadResponse,
    Server,
    Client,
    Other(String),
}

impl From<String> for ErrorType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "timeout" => ErrorType::Timeout,
            "canceled" => ErrorType::Canceled,
            "execution" => ErrorType::Execution,
            "bad_data" => ErrorType::BadData,
            "internal" => ErrorType::Internal,
            "unavailable" => ErrorType::Unavailable,
            "not_found" => ErrorType::NotFound,
            "bad_response" => ErrorType::BadResponse,
            "server_error" => ErrorType::Server,
            "client_error" => ErrorType::Client,
            _ => ErrorType::Other(value),
        }
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorType::Timeout => "timeout",
            ErrorType::Canceled => "canceled",
            ErrorType::Execution => "execution",
            ErrorType::BadData => "bad_data",
            ErrorType::Internal => "internal",
            ErrorType::Unavailable => "unavailable",
            ErrorType::NotFound => "not_found",
            ErrorType::BadResponse => "bad_response",
            ErrorType::Server => "server_error",
            ErrorType::Client => "client_error",
            ErrorType::Other(other) => other,
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while pushing to or querying Prometheus
#[derive(Debug, Error)]
pub enum PrometheusError {
    /// The API answered, but with an error
    #[error("{error_type}: {message}")]
    Api {
        error_type: ErrorType,
        message: String,
        /// Raw response body for errors derived from the status code
        detail: Option<String>,
    },

    /// Transport level failure
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server or gateway address is not a valid URL
    #[error("invalid address: {0}")]
    Url(#[from] url::ParseError),

    /// Building or encoding the pushed metrics failed
    #[error("metrics error: {0}")]
    Metrics(#[from] ::prometheus::Error),

    /// The PushGateway rejected the push
    #[error("unexpected status code {status} while pushing to {url}: {body}")]
    Push {
        status: u16,
        url: String,
        body: String,
    },

    /// `resultType` is not one of scalar, vector, matrix or string
    #[error("unexpected value type {0:?}")]
    UnexpectedValueType(String),

    /// The `result` payload does not match its `resultType`
    #[error("failed to decode query result: {0}")]
    Decode(#[from] serde_json::Error),

    /// A range query returned something other than a matrix
    #[error("expected a matrix result, got {0}")]
    NotMatrix(ValueType),
}

impl PrometheusError {
    pub(crate) fn api(error_type: ErrorType, message: impl Into<String>) -> Self {
        PrometheusError::Api {
            error_type,
            message: message.into(),
            detail: None,
        }
    }

    /// Error category for API errors.
    pub fn error_type(&self) -> Option<&ErrorType> {
        match self {
            PrometheusError::Api { error_type, .. } => Some(error_type),
            _ => None,
        }
    }
}
