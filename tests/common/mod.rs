//! Shared helpers: loopback mock backends and token builders.

#![allow(dead_code)]

use axum::Router;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::net::SocketAddr;

/// Serve `router` on an ephemeral loopback port
pub async fn spawn_backend(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An address nothing is listening on
pub async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn make_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"chatbot","exp":{}}}"#, exp));
    format!("{}.{}.sig", header, payload)
}

pub fn valid_token() -> String {
    make_token(chrono::Utc::now().timestamp() + 3600)
}

pub fn expired_token() -> String {
    make_token(chrono::Utc::now().timestamp() - 3600)
}

/// Decodable claims with no `exp` at all
pub fn token_without_exp() -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"chatbot"}"#);
    format!("{}.{}.sig", header, payload)
}
