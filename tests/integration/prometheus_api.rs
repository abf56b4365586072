//! Prometheus query API: POST with GET fallback, envelope decoding

use std::time::Duration;

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use devops_tools::prometheus::{
    ApiClient, ErrorType, MetricsInterface, Prometheus, PrometheusError, QueryOptions, QueryValue,
    Range, ValueType,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{failure, form, matrix_data, query, received, success};

fn range() -> Range {
    Range {
        start: Utc.timestamp_opt(1682217333, 0).unwrap(),
        end: Utc.timestamp_opt(1682217633, 0).unwrap(),
        step: Duration::from_secs(60),
    }
}

#[tokio::test]
async fn test_query_range_posts_form() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(matrix_data())))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&mock_server.uri()).unwrap();
    let options = QueryOptions::default().with_timeout(Duration::from_millis(1500));

    let series = Prometheus::default()
        .query_range(&client, "up", &range(), &options)
        .await
        .unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series[0].metric["job"], "node");
    assert_eq!(series[0].values.len(), 2);
    assert_eq!(series[0].values[0].timestamp, 1682217633000);
    assert_eq!(series[0].values[1].timestamp, 1682217693500);
    assert_eq!(series[0].values[1].value, 0.0);

    let requests = received(&mock_server).await;
    let form = form(&requests[0]);
    assert_eq!(form["query"], "up");
    assert_eq!(form["start"], "1682217333");
    assert_eq!(form["end"], "1682217633");
    assert_eq!(form["step"], "60");
    assert_eq!(form["timeout"], "1.5");
}

#[tokio::test]
async fn test_method_not_allowed_falls_back_to_get() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(ResponseTemplate::new(405))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query_range"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(matrix_data())))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&mock_server.uri()).unwrap();
    let series = Prometheus::default()
        .query_range(&client, "up", &range(), &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(series.len(), 1);

    let requests = received(&mock_server).await;
    assert_eq!(requests.len(), 2);

    let query = query(&requests[1]);
    assert_eq!(query["query"], "up");
    assert_eq!(query["step"], "60");
    assert!(!query.contains_key("timeout"));
}

#[tokio::test]
async fn test_not_implemented_falls_back_to_get() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(501))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!({
            "resultType": "scalar",
            "result": [1682217633, "42"]
        }))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&mock_server.uri()).unwrap();
    let value = Prometheus::default()
        .query(&client, "42", None, &QueryOptions::default())
        .await
        .unwrap();

    assert_matches!(value, QueryValue::Scalar(sample) if sample.value == 42.0);
}

#[tokio::test]
async fn test_bad_data_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(failure("bad_data", "parse error at char 3")),
        )
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&mock_server.uri()).unwrap();
    let err = Prometheus::default()
        .query(&client, "up{", None, &QueryOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.error_type(), Some(&ErrorType::BadData));
    assert_eq!(err.to_string(), "bad_data: parse error at char 3");
}

#[tokio::test]
async fn test_execution_error_on_unprocessable_entity() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(failure("execution", "query timed out")),
        )
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&mock_server.uri()).unwrap();
    let err = Prometheus::default()
        .query_range(&client, "up", &range(), &QueryOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.error_type(), Some(&ErrorType::Execution));
}

#[tokio::test]
async fn test_server_error_keeps_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&mock_server.uri()).unwrap();
    let err = Prometheus::default()
        .query(&client, "up", None, &QueryOptions::default())
        .await
        .unwrap_err();

    assert_matches!(
        err,
        PrometheusError::Api { error_type: ErrorType::Server, detail: Some(ref body), .. }
            if body == "bad gateway"
    );
}

#[tokio::test]
async fn test_instant_query_with_time_and_warnings() {
    let mock_server = MockServer::start().await;
    let mut body = success(json!({
        "resultType": "vector",
        "result": [
            {"metric": {"instance": "a"}, "value": [1682217633, "1"]},
            {"metric": {"instance": "b"}, "value": [1682217633, "NaN"]}
        ]
    }));
    body["warnings"] = json!(["result truncated"]);

    Mock::given(method("POST"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&mock_server.uri()).unwrap();
    let time = Utc.timestamp_opt(1682217633, 250_000_000).unwrap();

    let (value, warnings) = client
        .query("up", Some(time), &QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(warnings, vec!["result truncated".to_string()]);
    let QueryValue::Vector(vector) = value else {
        panic!("expected a vector, got {:?}", value.value_type());
    };
    assert_eq!(vector.len(), 2);
    assert_eq!(vector[0].value.value, 1.0);
    assert!(vector[1].value.value.is_nan());

    let requests = received(&mock_server).await;
    assert_eq!(form(&requests[0])["time"], "1682217633.25");
}

#[tokio::test]
async fn test_range_query_rejects_non_matrix() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!({
            "resultType": "vector",
            "result": []
        }))))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&mock_server.uri()).unwrap();
    let err = Prometheus::default()
        .query_range(&client, "up", &range(), &QueryOptions::default())
        .await
        .unwrap_err();

    assert_matches!(err, PrometheusError::NotMatrix(ValueType::Vector));
}

#[tokio::test]
async fn test_unknown_result_type() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!({
            "resultType": "histogram",
            "result": []
        }))))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&mock_server.uri()).unwrap();
    let err = client
        .query("up", None, &QueryOptions::default())
        .await
        .unwrap_err();

    assert_matches!(err, PrometheusError::UnexpectedValueType(ref kind) if kind == "histogram");
}
