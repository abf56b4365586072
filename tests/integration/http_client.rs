//! Pass-through HTTP helper

use devops_tools::common::{DevopsHttpClient as _, Headers, Params, new_client};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{closed_port, query, received};

#[tokio::test]
async fn test_get_sends_headers_and_returns_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .and(header("X-Token", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&mock_server)
        .await;

    let client = new_client(reqwest::Client::new());
    let headers = Headers::from([("X-Token".to_string(), "secret".to_string())]);

    let body = client
        .get(&format!("{}/status", mock_server.uri()), &headers)
        .await
        .unwrap();

    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_error_status_is_passed_through() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let client = new_client(reqwest::Client::new());
    let body = client.get(&mock_server.uri(), &Headers::new()).await.unwrap();

    assert_eq!(body, b"Internal Server Error");
}

#[tokio::test]
async fn test_post_replaces_query_string() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query"))
        .and(body_string("payload"))
        .respond_with(ResponseTemplate::new(201).set_body_string("Created"))
        .mount(&mock_server)
        .await;

    let client = new_client(reqwest::Client::new());
    let params = Params::from([
        ("query".to_string(), "sum(up)".to_string()),
        ("time".to_string(), "1700000000".to_string()),
    ]);

    let body = client
        .post(
            &format!("{}/api/v1/query?stale=true", mock_server.uri()),
            b"payload".to_vec(),
            &Headers::new(),
            &params,
        )
        .await
        .unwrap();
    assert_eq!(body, b"Created");

    let requests = received(&mock_server).await;
    assert_eq!(requests.len(), 1);

    let query = query(&requests[0]);
    assert_eq!(query.len(), 2);
    assert_eq!(query["query"], "sum(up)");
    assert_eq!(query["time"], "1700000000");
}

#[tokio::test]
async fn test_unreachable_host_is_an_error() {
    let addr = closed_port();

    let client = new_client(reqwest::Client::new());
    assert!(client.get(&format!("http://{addr}"), &Headers::new()).await.is_err());
}
