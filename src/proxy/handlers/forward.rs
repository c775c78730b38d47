// Catch-all forwarding handler
use axum::{
    body::Body,
    extract::{Request, State},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::error::ProxyError;
use crate::proxy::server::AppState;
use crate::proxy::upstream::client::{method_has_body, sanitize_response_headers};

/// Forward any verb under the route prefix to the configured backend.
///
/// The upstream status and body are relayed verbatim; failures become
/// `{"detail": ...}` with 502 (or 500 when no backend is configured).
pub async fn handle_forward(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let method = parts.method;
    let uri = parts.uri;

    let path = uri
        .path()
        .strip_prefix(state.route_prefix.as_str())
        .unwrap_or(uri.path())
        .trim_start_matches('/');

    let url = match state.upstream.build_target_url(path, uri.query()) {
        Ok(url) => url,
        Err(e) => {
            error!("[proxy] x  {} {}: {}", method, uri, e);
            return e.into_response();
        }
    };

    let body = if method_has_body(&method) {
        match axum::body::to_bytes(body, state.max_body_bytes).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("[proxy] x  {} {}: unreadable request body: {}", method, url, e);
                return ProxyError::BadRequest(format!("Failed to read request body: {}", e))
                    .into_response();
            }
        }
    } else {
        None
    };

    info!("[proxy] -> {} {}", method, url);
    let start = Instant::now();

    let upstream = match state
        .upstream
        .forward(method.clone(), &url, &parts.headers, body)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!(
                "[proxy] x  {} {} ({}ms): {}",
                method,
                url,
                start.elapsed().as_millis(),
                e
            );
            return e.into_response();
        }
    };

    let status = upstream.status();
    info!(
        "[proxy] <- {} {} {} ({}ms)",
        status.as_u16(),
        method,
        url,
        start.elapsed().as_millis()
    );

    let headers = sanitize_response_headers(upstream.headers());
    let stream_url = url.clone();
    let stream = upstream.bytes_stream().inspect_err(move |e| {
        warn!("[proxy] upstream body for {} ended early: {}", stream_url, e);
    });

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
