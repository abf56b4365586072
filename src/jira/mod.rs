//! Jira issue access over REST API v2
//!
//! Covers get, search and delete. Authentication is HTTP basic with username
//! and password (or API token) or a bearer token for OAuth 2.0 (3LO) and
//! personal access tokens.

pub mod error;
pub mod models;

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};
use url::Url;

pub use error::{JiraError, JiraResult};
pub use models::{
    GetQueryOptions, Issue, IssueFields, IssueType, Priority, Project, Response, SearchOptions,
    Status, User,
};

use models::SearchResult;

/// Credentials. A non-empty `token` wins over username and password.
#[derive(Clone, Default)]
pub struct AuthOptions {
    pub username: String,
    pub password: String,
    pub token: String,
}

impl fmt::Debug for AuthOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthOptions")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

#[derive(Clone)]
enum Auth {
    Basic { username: String, password: String },
    Bearer(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Auth::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

impl From<AuthOptions> for Auth {
    fn from(options: AuthOptions) -> Self {
        if !options.token.is_empty() {
            Auth::Bearer(options.token)
        } else {
            Auth::Basic {
                username: options.username.trim().to_string(),
                password: options.password.trim().to_string(),
            }
        }
    }
}

impl Auth {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::Bearer(token) => request.bearer_auth(token),
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            Auth::Basic { .. } => "basic",
            Auth::Bearer(_) => "bearer",
        }
    }
}

#[async_trait]
pub trait OpsJira: Send + Sync {
    async fn get(&self, issue_id: &str, options: &GetQueryOptions) -> JiraResult<(Issue, Response)>;

    async fn search(&self, jql: &str, options: &SearchOptions) -> JiraResult<(Vec<Issue>, Response)>;

    async fn delete(&self, issue_id: &str) -> JiraResult<Response>;
}

#[derive(Clone)]
pub struct Jira {
    client: Client,
    base_url: Url,
    auth: Auth,
}

impl fmt::Debug for Jira {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jira")
            .field("base_url", &self.base_url.as_str())
            .field("auth", &self.auth.scheme())
            .finish()
    }
}

impl Jira {
    /// Create an authenticated client for the Jira instance at `addr`.
    pub fn new(addr: &str, auth: AuthOptions) -> JiraResult<Self> {
        Self::with_client(addr, auth, Client::new())
    }

    pub fn with_client(addr: &str, auth: AuthOptions, client: Client) -> JiraResult<Self> {
        let addr = addr.trim();

        // relative endpoints are joined onto the base, which needs a trailing
        // slash to keep a context path such as `/jira`
        let normalized = if addr.ends_with('/') {
            addr.to_string()
        } else {
            format!("{addr}/")
        };
        let base_url = Url::parse(&normalized).map_err(|source| JiraError::InvalidAddress {
            addr: addr.to_string(),
            source,
        })?;

        let auth = Auth::from(auth);
        debug!("jira client for {base_url} using {} auth", auth.scheme());

        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> JiraResult<Url> {
        self.base_url
            .join(path)
            .map_err(|source| JiraError::InvalidAddress {
                addr: format!("{}{path}", self.base_url),
                source,
            })
    }

    fn issue_endpoint(&self, issue_id: &str) -> JiraResult<Url> {
        let mut url = self.endpoint("rest/api/2/issue")?;
        url.path_segments_mut()
            .map_err(|_| JiraError::InvalidAddress {
                addr: self.base_url.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            })?
            .push(issue_id);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> JiraResult<(StatusCode, String)> {
        let response = self.auth.apply(request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        trace!("received {status} ({} bytes)", body.len());

        if !status.is_success() {
            return Err(JiraError::Api {
                status: status.as_u16(),
                message: error::error_message(&body),
            });
        }

        Ok((status, body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> JiraResult<(StatusCode, T)> {
        let (status, body) = self.send(request).await?;
        Ok((status, serde_json::from_str(&body)?))
    }
}

#[async_trait]
impl OpsJira for Jira {
    #[instrument(skip(self, options))]
    async fn get(&self, issue_id: &str, options: &GetQueryOptions) -> JiraResult<(Issue, Response)> {
        let url = self.issue_endpoint(issue_id)?;
        let request = self.client.get(url).query(&options.to_query());

        let (status, issue) = self.send_json::<Issue>(request).await?;
        Ok((issue, Response::from_status(status)))
    }

    #[instrument(skip(self, options))]
    async fn search(&self, jql: &str, options: &SearchOptions) -> JiraResult<(Vec<Issue>, Response)> {
        let url = self.endpoint("rest/api/2/search")?;
        let request = self.client.get(url).query(&options.to_query(jql));

        let (status, result) = self.send_json::<SearchResult>(request).await?;
        debug!("search matched {} issues, returned {}", result.total, result.issues.len());

        let response = Response {
            status,
            start_at: result.start_at,
            max_results: result.max_results,
            total: result.total,
        };
        Ok((result.issues, response))
    }

    #[instrument(skip(self))]
    async fn delete(&self, issue_id: &str) -> JiraResult<Response> {
        let url = self.issue_endpoint(issue_id)?;
        let (status, _) = self.send(self.client.delete(url)).await?;
        Ok(Response::from_status(status))
    }
}
