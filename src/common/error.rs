//! Error types for the generic HTTP and SSH helpers

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for HTTP helper operations
pub type HttpResult<T> = Result<T, HttpError>;

/// Result type alias for SSH operations
pub type SshResult<T> = Result<T, SshError>;

/// Errors that can occur while talking plain HTTP
#[derive(Debug, Error)]
pub enum HttpError {
    /// The address could not be parsed as an absolute URL
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Building, sending or reading the request failed
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The request body could not be serialized
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors that can occur while executing a remote command
#[derive(Debug, Error)]
pub enum SshError {
    /// TCP connection to the remote host failed
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The private key file could not be read
    #[error("failed to read key file {}: {source}", path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The server rejected the supplied credentials
    #[error("authentication failed for user {user}: {source}")]
    Auth {
        user: String,
        #[source]
        source: ssh2::Error,
    },

    /// Handshake, channel or protocol level failure
    #[error("ssh session error: {0}")]
    Session(#[from] ssh2::Error),

    /// The command ran but exited with a non-zero status
    #[error("command exited with status {status}")]
    CommandFailed { status: i32, output: Vec<u8> },

    /// Reading the command output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking SSH task panicked or was cancelled
    #[error("ssh task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
