//! Helper functions for integration tests

use std::collections::HashMap;
use std::net::TcpListener;

use serde_json::{Value, json};
use wiremock::{MockServer, Request};

/// A successful Prometheus envelope around `data`.
pub fn success(data: Value) -> Value {
    json!({ "status": "success", "data": data })
}

/// A failed Prometheus envelope.
pub fn failure(error_type: &str, error: &str) -> Value {
    json!({ "status": "error", "errorType": error_type, "error": error })
}

pub fn matrix_data() -> Value {
    json!({
        "resultType": "matrix",
        "result": [
            {
                "metric": {"__name__": "up", "job": "node"},
                "values": [[1682217633, "1"], [1682217693.5, "0"]]
            }
        ]
    })
}

/// Decode a form-encoded request body.
pub fn form(request: &Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&request.body)
        .into_owned()
        .collect()
}

/// Query string of a request as a map.
pub fn query(request: &Request) -> HashMap<String, String> {
    request
        .url
        .query_pairs()
        .into_owned()
        .collect()
}

pub async fn received(server: &MockServer) -> Vec<Request> {
    server.received_requests().await.unwrap_or_default()
}

/// An address nothing listens on.
pub fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}
