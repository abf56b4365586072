//! Generic transport helpers: a pass-through HTTP client and one-shot SSH
//! command execution.

pub mod error;
pub mod http;
pub mod ssh;

pub use error::{HttpError, HttpResult, SshError, SshResult};
pub use http::{DevopsHttpClient, Headers, HttpClient, Params, new_client};
pub use ssh::Ssh;
