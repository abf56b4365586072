//! Pass-through HTTP helper
//!
//! Sends a request and hands the raw response body back to the caller. The
//! status code is not inspected; callers that care decode the body themselves.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{instrument, trace};
use url::Url;

use super::error::{HttpError, HttpResult};

/// Request headers, added verbatim.
pub type Headers = HashMap<String, String>;

/// Query parameters. Kept sorted so the encoded query string is stable.
pub type Params = BTreeMap<String, String>;

#[async_trait]
pub trait DevopsHttpClient: Send + Sync {
    /// GET `addr` and return the body of the response.
    async fn get(&self, addr: &str, headers: &Headers) -> HttpResult<Vec<u8>>;

    /// POST `payload` to `addr` and return the body of the response.
    ///
    /// `params` replace whatever query string `addr` already carries; an empty
    /// set removes it.
    async fn post(
        &self,
        addr: &str,
        payload: Vec<u8>,
        headers: &Headers,
        params: &Params,
    ) -> HttpResult<Vec<u8>>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Box a [`HttpClient`] around `client`.
pub fn new_client(client: Client) -> Box<dyn DevopsHttpClient> {
    Box::new(HttpClient::new(client))
}

/// Parse `addr` and replace its query string with `params`.
pub fn url_with_params(addr: &str, params: &Params) -> HttpResult<Url> {
    let mut url = Url::parse(addr).map_err(|source| HttpError::InvalidUrl {
        url: addr.to_string(),
        source,
    })?;

    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(params.iter());
    }

    Ok(url)
}

#[async_trait]
impl DevopsHttpClient for HttpClient {
    #[instrument(skip(self, headers))]
    async fn get(&self, addr: &str, headers: &Headers) -> HttpResult<Vec<u8>> {
        let mut request = self.client.get(addr);
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        trace!("{addr}: received {}", response.status());

        Ok(response.bytes().await?.to_vec())
    }

    #[instrument(skip(self, payload, headers))]
    async fn post(
        &self,
        addr: &str,
        payload: Vec<u8>,
        headers: &Headers,
        params: &Params,
    ) -> HttpResult<Vec<u8>> {
        let url = url_with_params(addr, params)?;

        let mut request = self.client.post(url).body(payload);
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        trace!("{addr}: received {}", response.status());

        Ok(response.bytes().await?.to_vec())
    }
}
