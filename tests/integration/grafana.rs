//! Open-source and Alibaba Cloud hosted Grafana

use chrono::{TimeZone, Utc};
use devops_tools::grafana::{
    AliGrafana, Datasource, DsQueryRequest, Grafana, MetricsInterface, Options, Query,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{query, received};

#[tokio::test]
async fn test_grafana_posts_body_with_token() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ds/query"))
        .and(header("Authorization", "Bearer glsa_key"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results":{}}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = r#"{"queries":[{"refId":"A","expr":"up"}],"from":"now-5m","to":"now"}"#;
    let response = Grafana::new()
        .unwrap()
        .query(
            &format!("{}/api/ds/query", mock_server.uri()),
            "Bearer glsa_key",
            body,
            Options::default(),
        )
        .await
        .unwrap();

    assert_eq!(response, br#"{"results":{}}"#);

    let requests = received(&mock_server).await;
    assert_eq!(String::from_utf8_lossy(&requests[0].body), body);
    assert!(requests[0].url.query().is_none());
}

#[tokio::test]
async fn test_grafana_error_body_is_returned() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"message":"Unauthorized"}"#))
        .mount(&mock_server)
        .await;

    let response = Grafana::new()
        .unwrap()
        .query_range(&mock_server.uri(), "", "{}", Options::default())
        .await
        .unwrap();

    assert_eq!(response, br#"{"message":"Unauthorized"}"#);
}

#[tokio::test]
async fn test_grafana_query_ds_serializes_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ds/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&mock_server)
        .await;

    let from = Utc.timestamp_opt(1700000000, 0).unwrap();
    let to = Utc.timestamp_opt(1700000300, 0).unwrap();
    let request = DsQueryRequest::new(
        vec![Query::prometheus("A", Datasource::new("prometheus", "P1809F7CD0C75ACF3"), "up")],
        from,
        to,
    );

    Grafana::new()
        .unwrap()
        .query_ds(&format!("{}/api/ds/query", mock_server.uri()), "Bearer k", &request)
        .await
        .unwrap();

    let requests = received(&mock_server).await;
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["from"], "1700000000000");
    assert_eq!(sent["to"], "1700000300000");
    assert_eq!(sent["queries"][0]["refId"], "A");
    assert_eq!(sent["queries"][0]["expr"], "up");
    assert_eq!(sent["queries"][0]["datasource"], json!({"type": "prometheus", "uid": "P1809F7CD0C75ACF3"}));
}

#[tokio::test]
async fn test_ali_grafana_instant_query_params() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/datasources/proxy/1/api/v1/query"))
        .and(header("Authorization", "Bearer ali"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"success"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let options = Options {
        to: 1700000000,
        ..Options::default()
    };
    let response = AliGrafana::new()
        .unwrap()
        .query(
            &format!("{}/api/datasources/proxy/1/api/v1/query", mock_server.uri()),
            "Bearer ali",
            "sum(up)",
            options,
        )
        .await
        .unwrap();
    assert_eq!(response, br#"{"status":"success"}"#);

    let requests = received(&mock_server).await;
    assert!(requests[0].body.is_empty());

    let query = query(&requests[0]);
    assert_eq!(query.len(), 2);
    assert_eq!(query["time"], "1700000000");
    assert_eq!(query["query"], "sum(up)");
}

#[tokio::test]
async fn test_ali_grafana_range_query_params() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/datasources/proxy/1/api/v1/query_range"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&mock_server)
        .await;

    let options = Options {
        from: 1699999700,
        to: 1700000000,
        step: 30,
    };
    AliGrafana::new()
        .unwrap()
        .query_range(
            &format!("{}/api/datasources/proxy/1/api/v1/query_range?old=1", mock_server.uri()),
            "Bearer ali",
            "rate(http_requests_total[5m])",
            options,
        )
        .await
        .unwrap();

    let requests = received(&mock_server).await;
    let query = query(&requests[0]);
    assert_eq!(query.len(), 4);
    assert_eq!(query["start"], "1699999700");
    assert_eq!(query["end"], "1700000000");
    assert_eq!(query["step"], "30");
    assert_eq!(query["query"], "rate(http_requests_total[5m])");
}
