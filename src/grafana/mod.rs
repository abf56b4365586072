//! Grafana datasource queries
//!
//! Two flavours, both returning the raw response body:
//!
//! - [`Grafana`]: open-source Grafana, `POST /api/ds/query` with a JSON body
//! - [`AliGrafana`]: Alibaba Cloud hosted Grafana, Prometheus query
//!   parameters sent to a datasource proxy URL such as
//!   `https://<id>.grafana.aliyuncs.com/api/datasources/proxy/<ds>/api/v1/query`

pub mod models;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::instrument;

use crate::common::{DevopsHttpClient, Headers, HttpClient, HttpResult, Params};

pub use models::{Datasource, Dimensions, DsQueryRequest, Query, Range, RawRange};

/// Errors surfaced by the Grafana clients
pub type GrafanaError = crate::common::HttpError;

/// Query window in unix seconds. `step` is in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    pub from: i64,
    pub to: i64,
    pub step: i64,
}

/// Settings for the HTTP client shared by both Grafana flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub max_idle_per_host: usize,
    /// Skip TLS certificate verification, for instances with self-signed
    /// certificates.
    pub insecure_skip_verify: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_idle_per_host: 10,
            insecure_skip_verify: false,
        }
    }
}

impl ClientOptions {
    pub fn build(&self) -> HttpResult<Client> {
        Ok(Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.max_idle_per_host)
            .danger_accept_invalid_certs(self.insecure_skip_verify)
            .build()?)
    }
}

#[async_trait]
pub trait MetricsInterface: Send + Sync {
    async fn query(&self, addr: &str, token: &str, query: &str, options: Options) -> HttpResult<Vec<u8>>;

    async fn query_range(
        &self,
        addr: &str,
        token: &str,
        query: &str,
        options: Options,
    ) -> HttpResult<Vec<u8>>;
}

fn headers(token: &str) -> Headers {
    let mut headers = Headers::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("Authorization".to_string(), token.to_string());
    headers
}

/// Open-source Grafana.
#[derive(Debug, Clone)]
pub struct Grafana {
    http: HttpClient,
}

impl Grafana {
    pub fn new() -> HttpResult<Self> {
        Self::with_options(&ClientOptions::default())
    }

    pub fn with_options(options: &ClientOptions) -> HttpResult<Self> {
        Ok(Self {
            http: HttpClient::new(options.build()?),
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            http: HttpClient::new(client),
        }
    }

    /// Serialize `request` and send it to `/api/ds/query` at `addr`.
    pub async fn query_ds(&self, addr: &str, token: &str, request: &DsQueryRequest) -> HttpResult<Vec<u8>> {
        let body = serde_json::to_vec(request)?;
        self.http.post(addr, body, &headers(token), &Params::new()).await
    }
}

#[async_trait]
impl MetricsInterface for Grafana {
    /// POST `query`, a complete `/api/ds/query` JSON body, to `addr`. `token`
    /// is the full `Authorization` header value, e.g. `Bearer <key>`. The time
    /// window lives inside the body, so `options` is unused.
    #[instrument(skip(self, token, query))]
    async fn query(&self, addr: &str, token: &str, query: &str, _options: Options) -> HttpResult<Vec<u8>> {
        self.http
            .post(addr, query.as_bytes().to_vec(), &headers(token), &Params::new())
            .await
    }

    async fn query_range(
        &self,
        addr: &str,
        token: &str,
        query: &str,
        options: Options,
    ) -> HttpResult<Vec<u8>> {
        self.query(addr, token, query, options).await
    }
}

/// Alibaba Cloud hosted Grafana.
#[derive(Debug, Clone)]
pub struct AliGrafana {
    http: HttpClient,
}

impl AliGrafana {
    pub fn new() -> HttpResult<Self> {
        Self::with_options(&ClientOptions::default())
    }

    pub fn with_options(options: &ClientOptions) -> HttpResult<Self> {
        Ok(Self {
            http: HttpClient::new(options.build()?),
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            http: HttpClient::new(client),
        }
    }
}

/// Parameters of an instant query evaluated at `options.to`.
pub fn instant_params(query: &str, options: &Options) -> Params {
    let mut params = Params::new();
    params.insert("time".to_string(), options.to.to_string());
    params.insert("query".to_string(), query.to_string());
    params
}

/// Parameters of a range query over `options`.
pub fn range_params(query: &str, options: &Options) -> Params {
    let mut params = Params::new();
    params.insert("end".to_string(), options.to.to_string());
    params.insert("start".to_string(), options.from.to_string());
    params.insert("step".to_string(), options.step.to_string());
    params.insert("query".to_string(), query.to_string());
    params
}

#[async_trait]
impl MetricsInterface for AliGrafana {
    #[instrument(skip(self, token))]
    async fn query(&self, addr: &str, token: &str, query: &str, options: Options) -> HttpResult<Vec<u8>> {
        self.http
            .post(addr, Vec::new(), &headers(token), &instant_params(query, &options))
            .await
    }

    #[instrument(skip(self, token))]
    async fn query_range(
        &self,
        addr: &str,
        token: &str,
        query: &str,
        options: Options,
    ) -> HttpResult<Vec<u8>> {
        self.http
            .post(addr, Vec::new(), &headers(token), &range_params(query, &options))
            .await
    }
}
