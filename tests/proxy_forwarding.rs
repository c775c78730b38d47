//! Forwarding route against a live loopback backend.

mod common;

use axum::{
    body::Bytes,
    extract::RawQuery,
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use loyalty_relay::proxy::{AxumServer, ProxyConfig};
use serde_json::{json, Value};
use std::time::Duration;

/// Echo what the backend received
async fn echo(method: Method, RawQuery(query): RawQuery, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let names: Vec<String> = headers.keys().map(|k| k.as_str().to_string()).collect();
    let payload = json!({
        "method": method.as_str(),
        "query": query,
        "headers": names,
        "authorization": headers.get("authorization").and_then(|v| v.to_str().ok()),
        "session_id": headers.get("session-id").and_then(|v| v.to_str().ok()),
        "body": String::from_utf8_lossy(&body),
    });

    (
        StatusCode::CREATED,
        [
            ("access-control-allow-origin", "*"),
            ("access-control-allow-credentials", "true"),
            ("x-backend", "mock"),
        ],
        Json(payload),
    )
}

async fn teapot() -> impl IntoResponse {
    (StatusCode::IM_A_TEAPOT, Json(json!({"detail": "short and stout"})))
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({"late": true}))
}

async fn start_proxy(backend: String, timeout_ms: u64) -> (AxumServer, String) {
    let config = ProxyConfig {
        backend_server: Some(backend),
        timeout_ms,
        port: 0,
        ..Default::default()
    };
    let (server, _handle) = AxumServer::start(&config).await.unwrap();
    let base = format!("http://{}/api/mcp", server.local_addr());
    (server, base)
}

async fn backend() -> String {
    let router = Router::new()
        .route("/context/agent", any(echo))
        .route("/teapot", get(teapot))
        .route("/slow", get(slow));
    let addr = common::spawn_backend(router).await;
    format!("http://{}/", addr)
}

#[tokio::test]
async fn test_forwards_allow_listed_headers_and_query() {
    let (server, base) = start_proxy(backend().await, 5_000).await;

    let response = reqwest::Client::new()
        .post(format!("{}/context/agent?prompt=hello%20there&x=1", base))
        .header("Authorization", "Bearer tkn")
        .header("session-id", "sess-1")
        .header("Content-Type", "application/json")
        .header("Cookie", "secret=1")
        .header("X-Custom", "nope")
        .body(r#"{"k":"v"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers().get("x-backend").unwrap(), "mock");
    assert!(response.headers().get("access-control-allow-origin").is_none());
    assert!(response.headers().get("access-control-allow-credentials").is_none());

    let seen: Value = response.json().await.unwrap();
    assert_eq!(seen["method"], "POST");
    assert_eq!(seen["query"], "prompt=hello%20there&x=1");
    assert_eq!(seen["authorization"], "Bearer tkn");
    assert_eq!(seen["session_id"], "sess-1");
    assert_eq!(seen["body"], r#"{"k":"v"}"#);

    let headers: Vec<String> = serde_json::from_value(seen["headers"].clone()).unwrap();
    assert!(!headers.contains(&"cookie".to_string()));
    assert!(!headers.contains(&"x-custom".to_string()));

    server.stop();
}

#[tokio::test]
async fn test_get_drops_request_body() {
    let (server, base) = start_proxy(backend().await, 5_000).await;

    let seen: Value = reqwest::Client::new()
        .get(format!("{}/context/agent", base))
        .body("ignored")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(seen["method"], "GET");
    assert_eq!(seen["body"], "");
    server.stop();
}

#[tokio::test]
async fn test_upstream_status_and_body_pass_through() {
    let (server, base) = start_proxy(backend().await, 5_000).await;

    let response = reqwest::get(format!("{}/teapot", base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "short and stout");

    let missing = reqwest::get(format!("{}/not-there", base)).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    server.stop();
}

#[tokio::test]
async fn test_timeout_returns_502() {
    let (server, base) = start_proxy(backend().await, 200).await;

    let started = std::time::Instant::now();
    let response = reqwest::get(format!("{}/slow", base)).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"detail": "Upstream timeout after 200ms"}));

    server.stop();
}

#[tokio::test]
async fn test_network_failure_returns_502() {
    let dead = common::closed_port().await;
    let (server, base) = start_proxy(format!("http://{}", dead), 5_000).await;

    let response = reqwest::Client::new()
        .post(format!("{}/auth/login", base))
        .body("{}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert!(!body["detail"].as_str().unwrap().is_empty());

    server.stop();
}

/// Accept one connection, capture the raw request head and answer `{}`
async fn raw_backend() -> (String, tokio::sync::oneshot::Receiver<String>) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
            )
            .await
            .unwrap();
        let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
    });

    (format!("http://{}", addr), rx)
}

#[tokio::test]
async fn test_session_header_is_title_cased_on_the_wire() {
    let (backend, head_rx) = raw_backend().await;
    let (server, base) = start_proxy(backend, 5_000).await;

    let response = reqwest::Client::new()
        .get(format!("{}/context/agent?prompt=hi", base))
        .header("session-id", "sess-9")
        .header("authorization", "Bearer tkn")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "{}");

    let head = head_rx.await.unwrap();
    assert!(head.starts_with("GET /context/agent?prompt=hi HTTP/1.1\r\n"), "{}", head);
    assert!(head.contains("\r\nSession-Id: sess-9\r\n"), "{}", head);
    assert!(head.contains("\r\nAuthorization: Bearer tkn\r\n"), "{}", head);
    assert!(!head.contains("session-id:"), "{}", head);

    server.stop();
}
