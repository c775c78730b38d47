// Upstream client for the forwarding route
//
// Rebuilds the target URL against the configured backend, passes through
// an allow-listed subset of request headers and bounds the wait for the
// upstream response.

use axum::http::{HeaderMap, HeaderName, Method};
use bytes::Bytes;
use reqwest::{Client, Response};
use tokio::time::Duration;

use crate::error::ProxyError;
use crate::proxy::ProxyConfig;

/// Request headers passed through to the backend (compared lowercase)
pub const FORWARDED_HEADERS: [&str; 4] = ["authorization", "content-type", "accept", "session-id"];

/// Response headers dropped before the body is re-sent to the caller
pub const STRIPPED_RESPONSE_HEADERS: [&str; 6] = [
    "access-control-allow-origin",
    "access-control-allow-credentials",
    "content-encoding",
    "transfer-encoding",
    "content-length",
    "connection",
];

pub struct UpstreamClient {
    http_client: Client,
    base_url: Option<String>,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let http_client = crate::utils::http::create_upstream_client()
            .map_err(|e| ProxyError::Upstream(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url().map(str::to_string),
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Build the upstream URL: `{base}/{path}{?query}`
    pub fn build_target_url(&self, path: &str, query: Option<&str>) -> Result<String, ProxyError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or(ProxyError::BackendNotConfigured)?;
        Ok(join_target_url(base, path, query))
    }

    /// Forward a request and wait for the upstream response headers.
    ///
    /// Dropping the in-flight future on timeout aborts the upstream call.
    pub async fn forward(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Response, ProxyError> {
        let mut builder = self
            .http_client
            .request(method, url)
            .headers(forward_headers(headers));

        if let Some(body) = body {
            builder = builder.body(body);
        }

        match tokio::time::timeout(self.timeout, builder.send()).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(ProxyError::Upstream(describe_reqwest_error(&e))),
            Err(_) => Err(ProxyError::Timeout(self.timeout_ms())),
        }
    }
}

pub fn join_target_url(base: &str, path: &str, query: Option<&str>) -> String {
    match query.filter(|q| !q.is_empty()) {
        Some(qs) => format!("{}/{}?{}", base, path, qs),
        None => format!("{}/{}", base, path),
    }
}

/// Keep only the allow-listed request headers
pub fn forward_headers(incoming: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in incoming {
        if FORWARDED_HEADERS.contains(&name.as_str()) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

/// Copy upstream response headers minus the transport and CORS ones
pub fn sanitize_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    for name in STRIPPED_RESPONSE_HEADERS {
        headers.remove(HeaderName::from_static(name));
    }
    headers
}

/// Methods that never carry a forwarded body
pub fn method_has_body(method: &Method) -> bool {
    method != Method::GET && method != Method::HEAD
}

fn describe_reqwest_error(e: &reqwest::Error) -> String {
    if e.is_connect() {
        format!("Upstream connection failed: {}", e)
    } else {
        format!("Upstream fetch failed: {}", e)
    }
}
