//! Prometheus push and query access
//!
//! - [`Prometheus::push`] sends a gauge family to a PushGateway
//! - [`ApiClient`] speaks the query part of the HTTP API v1
//! - [`MetricsInterface`] ties both together behind one object-safe trait
//!
//! ## Usage
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use chrono::Utc;
//! use devops_tools::prometheus::{ApiClient, MetricsInterface, Prometheus, QueryOptions, Range};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ApiClient::new("http://localhost:9090")?;
//!     let range = Range::ending_at(Utc::now(), chrono::Duration::minutes(4), Duration::from_secs(60))
//!         .ok_or_else(|| anyhow::anyhow!("window out of range"))?;
//!     let options = QueryOptions::default().with_timeout(Duration::from_secs(5));
//!
//!     let series = Prometheus::default()
//!         .query_range(&client, "up", &range, &options)
//!         .await?;
//!     println!("{series:?}");
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod error;
pub mod push;
pub mod result;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method};
use tracing::{instrument, warn};

pub use api::{ApiClient, ApiResponse, QueryOptions, Range, Warnings};
pub use error::{ErrorType, PrometheusError, PrometheusResult};
pub use push::{PromMetric, PushMetrics, gauge_vec};
pub use result::{MatrixResult, Metric, QueryValue, SamplePair, Scalar, StringSample, ValueType, VectorResult};

#[async_trait]
pub trait MetricsInterface: Send + Sync {
    /// Replace the metrics of job `metrics.name` on the PushGateway at `addr`.
    async fn push(&self, metrics: &PushMetrics, addr: &str) -> PrometheusResult<()>;

    /// Range query; the result must be a matrix.
    async fn query_range(
        &self,
        client: &ApiClient,
        query: &str,
        range: &Range,
        options: &QueryOptions,
    ) -> PrometheusResult<Vec<MatrixResult>>;

    /// Instant query at `time`, or now.
    async fn query(
        &self,
        client: &ApiClient,
        query: &str,
        time: Option<DateTime<Utc>>,
        options: &QueryOptions,
    ) -> PrometheusResult<QueryValue>;
}

#[derive(Debug, Clone, Default)]
pub struct Prometheus {
    client: Client,
}

impl Prometheus {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Add `metrics` to job `metrics.name` without replacing other metric
    /// families already pushed for that job.
    pub async fn add(&self, metrics: &PushMetrics, addr: &str) -> PrometheusResult<()> {
        push::send(&self.client, Method::POST, metrics, addr).await
    }
}

fn log_warnings(warnings: &Warnings) {
    if !warnings.is_empty() {
        warn!("query returned warnings: {warnings:?}");
    }
}

#[async_trait]
impl MetricsInterface for Prometheus {
    async fn push(&self, metrics: &PushMetrics, addr: &str) -> PrometheusResult<()> {
        push::send(&self.client, Method::PUT, metrics, addr).await
    }

    #[instrument(skip(self, client, range, options))]
    async fn query_range(
        &self,
        client: &ApiClient,
        query: &str,
        range: &Range,
        options: &QueryOptions,
    ) -> PrometheusResult<Vec<MatrixResult>> {
        let (value, warnings) = client.query_range(query, range, options).await?;
        log_warnings(&warnings);
        value.into_matrix()
    }

    #[instrument(skip(self, client, time, options))]
    async fn query(
        &self,
        client: &ApiClient,
        query: &str,
        time: Option<DateTime<Utc>>,
        options: &QueryOptions,
    ) -> PrometheusResult<QueryValue> {
        let (value, warnings) = client.query(query, time, options).await?;
        log_warnings(&warnings);
        Ok(value)
    }
}
