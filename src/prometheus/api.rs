//! Minimal Prometheus HTTP API v1 client
//!
//! Only the query endpoints are covered. Requests go out as form-encoded POSTs
//! and are retried once as GET when the server answers 405 or 501, which is
//! what older Prometheus versions and some read-only proxies do.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, trace};
use url::Url;
use url::form_urlencoded;

use super::error::{ErrorType, PrometheusError, PrometheusResult};
use super::result::QueryValue;
use crate::common::Params;

pub const API_PREFIX: &str = "/api/v1";
const EP_QUERY: &str = "/api/v1/query";
const EP_QUERY_RANGE: &str = "/api/v1/query_range";

/// Non-critical errors returned next to a successful result.
pub type Warnings = Vec<String>;

/// Time window of a range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
}

impl Range {
    /// A window of `length` ending at `end`. `None` when `length` is negative
    /// or reaches outside the representable time range.
    pub fn ending_at(end: DateTime<Utc>, length: chrono::Duration, step: Duration) -> Option<Self> {
        if length < chrono::Duration::zero() {
            return None;
        }

        Some(Self {
            start: end.checked_sub_signed(length)?,
            end,
            step,
        })
    }
}

/// Optional query parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Evaluation timeout enforced by the server.
    pub timeout: Option<Duration>,
}

impl QueryOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Unwrapped API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub data: Value,
    pub warnings: Warnings,
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    data: Value,
    #[serde(rename = "errorType", default)]
    error_type: Option<ErrorType>,
    #[serde(default)]
    error: String,
    #[serde(default)]
    warnings: Warnings,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    address: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(address: &str) -> PrometheusResult<Self> {
        Self::with_client(address, Client::new())
    }

    pub fn with_client(address: &str, client: Client) -> PrometheusResult<Self> {
        Ok(Self {
            address: Url::parse(address.trim())?,
            client,
        })
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    /// Build the URL of `endpoint`, replacing `:name` placeholders with the
    /// matching value from `args`.
    pub fn url(&self, endpoint: &str, args: &[(&str, &str)]) -> Url {
        let mut path = format!("{}{endpoint}", self.address.path().trim_end_matches('/'));
        for (arg, value) in args {
            path = path.replace(&format!(":{arg}"), value);
        }

        let mut url = self.address.clone();
        url.set_path(&path);
        url
    }

    async fn execute(&self, request: RequestBuilder) -> PrometheusResult<(StatusCode, Vec<u8>)> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        trace!("received {status} ({} bytes)", body.len());
        Ok((status, body))
    }

    /// Send `request` and unwrap the API envelope of its response.
    pub async fn do_request(&self, request: RequestBuilder) -> PrometheusResult<ApiResponse> {
        let (status, body) = self.execute(request).await?;
        decode_response(status, &body)
    }

    /// POST `args` form-encoded to `url`; on 405 or 501 repeat the request as
    /// a GET with `args` in the query string.
    #[instrument(skip(self, args), fields(url = %url))]
    pub async fn do_get_fallback(&self, url: Url, args: &Params) -> PrometheusResult<ApiResponse> {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(args.iter())
            .finish();

        let post = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(encoded.clone());

        let (status, body) = self.execute(post).await?;
        if status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_IMPLEMENTED {
            debug!("POST answered with {status}, falling back to GET");

            let mut url = url;
            url.set_query(Some(&encoded));
            let (status, body) = self.execute(self.client.get(url)).await?;
            return decode_response(status, &body);
        }

        decode_response(status, &body)
    }

    /// Evaluate `query` over `range`.
    #[instrument(skip(self, range, options))]
    pub async fn query_range(
        &self,
        query: &str,
        range: &Range,
        options: &QueryOptions,
    ) -> PrometheusResult<(QueryValue, Warnings)> {
        let url = self.url(EP_QUERY_RANGE, &[]);

        let mut args = Params::new();
        args.insert("query".to_string(), query.to_string());
        args.insert("start".to_string(), format_time(&range.start));
        args.insert("end".to_string(), format_time(&range.end));
        args.insert("step".to_string(), format_seconds(range.step));
        if let Some(timeout) = options.timeout {
            args.insert("timeout".to_string(), format_seconds(timeout));
        }

        let response = self.do_get_fallback(url, &args).await?;
        Ok((QueryValue::from_data(response.data)?, response.warnings))
    }

    /// Evaluate `query` at a single point in time, or at the server's current
    /// time when `time` is `None`.
    #[instrument(skip(self, time, options))]
    pub async fn query(
        &self,
        query: &str,
        time: Option<DateTime<Utc>>,
        options: &QueryOptions,
    ) -> PrometheusResult<(QueryValue, Warnings)> {
        let url = self.url(EP_QUERY, &[]);

        let mut args = Params::new();
        args.insert("query".to_string(), query.to_string());
        if let Some(time) = time {
            args.insert("time".to_string(), format_time(&time));
        }
        if let Some(timeout) = options.timeout {
            args.insert("timeout".to_string(), format_seconds(timeout));
        }

        let response = self.do_get_fallback(url, &args).await?;
        Ok((QueryValue::from_data(response.data)?, response.warnings))
    }
}

/// Status codes Prometheus answers with when the body carries an API error.
fn is_api_error(status: StatusCode) -> bool {
    status == StatusCode::UNPROCESSABLE_ENTITY || status == StatusCode::BAD_REQUEST
}

fn error_type_and_message(status: StatusCode) -> (ErrorType, String) {
    let code = status.as_u16();
    match code / 100 {
        4 => (ErrorType::Client, format!("client error: {code}")),
        5 => (ErrorType::Server, format!("server error: {code}")),
        _ => (ErrorType::BadResponse, format!("bad response code {code}")),
    }
}

/// Turn a raw status and body into the envelope's data and warnings, or the
/// error the envelope or status code describes.
pub fn decode_response(status: StatusCode, body: &[u8]) -> PrometheusResult<ApiResponse> {
    if !status.is_success() && !is_api_error(status) {
        let (error_type, message) = error_type_and_message(status);
        return Err(PrometheusError::Api {
            error_type,
            message,
            detail: Some(String::from_utf8_lossy(body).into_owned()),
        });
    }

    let envelope = if status == StatusCode::NO_CONTENT {
        Envelope::default()
    } else {
        serde_json::from_slice::<Envelope>(body)
            .map_err(|e| PrometheusError::api(ErrorType::BadResponse, e.to_string()))?
    };

    if is_api_error(status) && envelope.status == "success" {
        return Err(PrometheusError::api(
            ErrorType::BadResponse,
            "inconsistent body for response code",
        ));
    }

    if envelope.status == "error" {
        return Err(PrometheusError::api(
            envelope
                .error_type
                .unwrap_or_else(|| ErrorType::Other(String::new())),
            envelope.error,
        ));
    }

    Ok(ApiResponse {
        status,
        data: envelope.data,
        warnings: envelope.warnings,
    })
}

/// Unix seconds with the sub-second part as a fraction, in the shortest
/// decimal form that round-trips.
pub fn format_time(time: &DateTime<Utc>) -> String {
    let seconds = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) / 1e9;
    seconds.to_string()
}

/// A duration as (fractional) seconds.
pub fn format_seconds(duration: Duration) -> String {
    duration.as_secs_f64().to_string()
}
