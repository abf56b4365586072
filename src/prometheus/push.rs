//! Pushing gauges to a PushGateway

use ::prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use tracing::{debug, error, instrument};
use url::Url;

use super::error::{PrometheusError, PrometheusResult};

/// A gauge family to push. `name` is both the metric name and the job name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushMetrics {
    pub name: String,
    pub labels: Vec<String>,
    pub metrics: Vec<PromMetric>,
}

/// One sample: the label values, in the order of [`PushMetrics::labels`], and
/// the gauge value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromMetric {
    pub values: Vec<String>,
    pub data: f64,
}

/// A gauge vector named `name` partitioned by `labels`.
pub fn gauge_vec(name: &str, labels: &[String]) -> PrometheusResult<GaugeVec> {
    let opts = Opts::new(name, format!("The jobs of {name} in dynatrace."));
    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
    Ok(GaugeVec::new(opts, &labels)?)
}

/// Render `metrics` in the text exposition format.
pub fn encode(metrics: &PushMetrics) -> PrometheusResult<Vec<u8>> {
    let gauge = gauge_vec(&metrics.name, &metrics.labels)?;
    for metric in &metrics.metrics {
        let values: Vec<&str> = metric.values.iter().map(String::as_str).collect();
        gauge.get_metric_with_label_values(&values)?.set(metric.data);
    }

    let registry = Registry::new();
    registry.register(Box::new(gauge))?;

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(buffer)
}

/// `{addr}/metrics/job/{job}`, defaulting to `http://` when `addr` has no
/// scheme. A job containing `/` goes out as `job@base64/{url-safe base64}`,
/// since the gateway splits the path on `/`.
pub fn push_url(addr: &str, job: &str) -> PrometheusResult<Url> {
    let addr = addr.trim().trim_end_matches('/');
    let addr = if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    };

    let (key, value) = if job.contains('/') {
        ("job@base64", URL_SAFE_NO_PAD.encode(job))
    } else {
        ("job", job.to_string())
    };

    let mut url = Url::parse(&addr)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(["metrics", key, value.as_str()]);
    Ok(url)
}

#[instrument(skip(client, metrics), fields(job = %metrics.name))]
pub(crate) async fn send(
    client: &Client,
    method: Method,
    metrics: &PushMetrics,
    addr: &str,
) -> PrometheusResult<()> {
    let body = encode(metrics)?;
    let url = push_url(addr, &metrics.name)?;

    debug!("{method} {} samples to {url}", metrics.metrics.len());

    let response = client
        .request(method, url.clone())
        .header(CONTENT_TYPE, TextEncoder::new().format_type())
        .body(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!("push to {url} failed with status {status}");
        return Err(PrometheusError::Push {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        });
    }

    Ok(())
}
