//! Tests for the balancer's HTTP binding.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use balancer::{BackendClient, BackendError, BackendResponse, StaticProvisioner};
use bytes::Bytes;
use cli::commands::build_state;
use cli::http::{create_router, replica_router, REQUEST_KEY_HEADER, SERVED_BY_HEADER};
use cli::BalancerConfig;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Answers like a replica named after the host part of the address.
struct EchoBackend;

#[async_trait]
impl BackendClient for EchoBackend {
    async fn get(&self, address: &str, path: &str) -> Result<BackendResponse, BackendError> {
        let server = address.trim_start_matches("http://").trim_end_matches(":5000");
        if server == "down" {
            return Err(BackendError::Connect("connection refused".to_string()));
        }
        Ok(BackendResponse {
            status: if server == "broken" { 500 } else { 200 },
            content_type: Some("application/json".to_string()),
            body: Bytes::from(
                json!({"message": format!("Hello from Server: {}", server), "path": path}).to_string(),
            ),
        })
    }
}

async fn test_router(replicas: &[&str]) -> axum::Router {
    let config = BalancerConfig::default();
    let state = build_state(&config, Arc::new(StaticProvisioner::default()), Arc::new(EchoBackend)).unwrap();
    state
        .membership
        .bootstrap(replicas.iter().map(|r| r.to_string()).collect())
        .await
        .unwrap();
    create_router(state)
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_list_replicas() {
    let app = test_router(&["S1", "S2", "S3"]).await;
    let (status, body) = send(&app, get("/rep")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"message": {"N": 3, "replicas": ["S1", "S2", "S3"]}, "status": "successful"})
    );
}

#[tokio::test]
async fn test_add_and_remove() {
    let app = test_router(&["S1"]).await;

    let (status, body) = send(&app, json_request("POST", "/add", json!({"n": 2, "hostnames": ["S5"]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "successful");
    assert_eq!(body["message"]["N"], 3);
    assert!(body["message"]["replicas"].as_array().unwrap().contains(&json!("S5")));
    assert!(body.get("failed").is_none());

    let (status, body) = send(&app, json_request("DELETE", "/rm", json!({"n": 2, "hostnames": ["S1"]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["N"], 1);
    assert!(!body["message"]["replicas"].as_array().unwrap().contains(&json!("S1")));
}

#[tokio::test]
async fn test_add_validation_errors() {
    let app = test_router(&["S1"]).await;

    let (status, body) = send(&app, json_request("POST", "/add", json!({"n": 1, "hostnames": ["a", "b"]}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "message": "<Error> Length of hostname list is more than newly added instances",
            "kind": "validation",
            "status": "failure"
        })
    );

    let (status, body) = send(&app, json_request("POST", "/add", json!({"n": -1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, _) = send(&app, json_request("POST", "/add", json!({"hostnames": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_name_conflict() {
    let app = test_router(&["S1"]).await;
    let (status, body) = send(&app, json_request("POST", "/add", json!({"n": 1, "hostnames": ["S1"]}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "name_conflict");
}

#[tokio::test]
async fn test_remove_unknown_hostname() {
    let app = test_router(&["S1", "S2"]).await;
    let (status, body) = send(&app, json_request("DELETE", "/rm", json!({"n": 2, "hostnames": ["x"]}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "failure");

    let (_, body) = send(&app, get("/rep")).await;
    assert_eq!(body["message"]["N"], 2);
}

#[tokio::test]
async fn test_route_relays_backend() {
    let app = test_router(&["S1", "S2", "S3"]).await;
    let request = Request::builder()
        .uri("/home")
        .header(REQUEST_KEY_HEADER, "client-1")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let served_by = response.headers()[SERVED_BY_HEADER].to_str().unwrap().to_string();
    assert_eq!(response.headers()["content-type"], "application/json");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], format!("Hello from Server: {}", served_by));
    assert_eq!(body["path"], "home");

    // Same key, same replica
    for _ in 0..5 {
        let request = Request::builder()
            .uri("/home")
            .header(REQUEST_KEY_HEADER, "client-1")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[SERVED_BY_HEADER], served_by.as_str());
    }
}

#[tokio::test]
async fn test_route_errors() {
    let app = test_router(&[]).await;
    let (status, body) = send(&app, get("/home")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "no_active_servers");

    let app = test_router(&["S1"]).await;
    let (status, body) = send(&app, get("/other")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "<Error> '/other' endpoint does not exist in server replicas"
    );

    let app = test_router(&["down"]).await;
    let (status, body) = send(&app, get("/home")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "backend_unavailable");

    let app = test_router(&["broken"]).await;
    let (status, _) = send(&app, get("/home")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unmatched_requests_use_error_envelope() {
    let app = test_router(&[]).await;
    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "no_active_servers");

    let app = test_router(&["S1"]).await;
    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "message": "<Error> '/' endpoint does not exist in server replicas",
            "kind": "unknown_endpoint",
            "status": "failure"
        })
    );

    let (status, body) = send(&app, json_request("POST", "/home", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "unknown_endpoint");

    let (status, body) = send(&app, json_request("PUT", "/rep", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "failure");
}

#[tokio::test]
async fn test_add_rejects_hostnames_with_url_syntax() {
    let app = test_router(&["S1"]).await;
    for hostname in ["x@169.254.169.254", "host:8080", "-d"] {
        let (status, body) =
            send(&app, json_request("POST", "/add", json!({"n": 1, "hostnames": [hostname]}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", hostname);
        assert_eq!(body["kind"], "validation");
    }

    let (_, body) = send(&app, get("/rep")).await;
    assert_eq!(body["message"]["N"], 1);
}

#[tokio::test]
async fn test_describe_replica() {
    let app = test_router(&["S1", "S2"]).await;
    let (status, body) = send(&app, get("/rep/S2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["name"], "S2");
    assert_eq!(body["message"]["address"], "http://S2:5000");
    assert_eq!(body["message"]["status"], "active");
    assert_eq!(body["message"]["slots"].as_array().unwrap().len(), 9);

    let (status, _) = send(&app, get("/rep/S9")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_replica_endpoints() {
    let app = replica_router("S7");
    let (status, body) = send(&app, get("/home")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Hello from Server: S7", "status": "successful"}));

    let (status, body) = send(&app, get("/heartbeat")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}
