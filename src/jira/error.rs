//! Error types for the Jira client

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

/// Result type alias for Jira operations
pub type JiraResult<T> = Result<T, JiraError>;

#[derive(Debug, Error)]
pub enum JiraError {
    /// The base address is not a valid URL
    #[error("invalid jira address {addr:?}: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: url::ParseError,
    },

    /// Transport level failure
    #[error("jira request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Jira answered with a non-2xx status
    #[error("jira returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body is not what the endpoint documents
    #[error("failed to decode jira response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Error body Jira sends with 4xx responses.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: BTreeMap<String, String>,
}

/// Summarize an error response: Jira's own messages when the body carries
/// them, the raw body otherwise.
pub(crate) fn error_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return body.trim().to_string();
    };

    let mut messages = parsed.error_messages;
    messages.extend(
        parsed
            .errors
            .into_iter()
            .map(|(field, message)| format!("{field}: {message}")),
    );

    if messages.is_empty() {
        body.trim().to_string()
    } else {
        messages.join("; ")
    }
}
