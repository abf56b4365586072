//! Pushing to a PushGateway

use assert_matches::assert_matches;
use devops_tools::prometheus::{MetricsInterface, PromMetric, Prometheus, PrometheusError, PushMetrics};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::received;

fn metrics() -> PushMetrics {
    PushMetrics {
        name: "test".to_string(),
        labels: vec!["sample1".to_string(), "sample2".to_string()],
        metrics: vec![PromMetric {
            values: vec!["s1".to_string(), "s2".to_string()],
            data: 99.99,
        }],
    }
}

#[tokio::test]
async fn test_push_replaces_job_metrics() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/metrics/job/test"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Prometheus::default()
        .push(&metrics(), &mock_server.uri())
        .await
        .unwrap();

    let requests = received(&mock_server).await;
    let body = String::from_utf8(requests[0].body.clone()).unwrap();

    assert!(body.contains("# HELP test The jobs of test in dynatrace."), "{body}");
    assert!(body.contains("# TYPE test gauge"), "{body}");
    assert!(body.contains(r#"test{sample1="s1",sample2="s2"} 99.99"#), "{body}");
}

#[tokio::test]
async fn test_address_without_scheme_defaults_to_http() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/metrics/job/test"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let addr = mock_server.address().to_string();
    Prometheus::default().push(&metrics(), &addr).await.unwrap();
}

#[tokio::test]
async fn test_add_uses_post() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/metrics/job/test"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Prometheus::default()
        .add(&metrics(), &mock_server.uri())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejected_push() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(400).set_body_string("inconsistent labels"))
        .mount(&mock_server)
        .await;

    let err = Prometheus::default()
        .push(&metrics(), &mock_server.uri())
        .await
        .unwrap_err();

    assert_matches!(
        err,
        PrometheusError::Push { status: 400, ref body, .. } if body == "inconsistent labels"
    );
}

#[tokio::test]
async fn test_label_count_mismatch_is_not_sent() {
    let mock_server = MockServer::start().await;

    let mut metrics = metrics();
    metrics.metrics[0].values.pop();

    let err = Prometheus::default()
        .push(&metrics, &mock_server.uri())
        .await
        .unwrap_err();

    assert_matches!(err, PrometheusError::Metrics(_));
    assert!(received(&mock_server).await.is_empty());
}
