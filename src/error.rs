//! Crate-wide error type

use thiserror::Error;

use crate::common::{HttpError, SshError};
use crate::jira::JiraError;
use crate::prometheus::PrometheusError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any error this crate can produce, for callers juggling several clients.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Prometheus(#[from] PrometheusError),

    #[error(transparent)]
    Jira(#[from] JiraError),

    #[error(transparent)]
    Ssh(#[from] SshError),
}
