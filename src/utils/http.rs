use reqwest::Client;

const USER_AGENT: &str = concat!("loyalty-relay/", env!("CARGO_PKG_VERSION"));

/// Create the HTTP client used by the chat front end
pub fn create_client(timeout_secs: u64) -> Client {
    let builder = Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT);

    builder.build().unwrap_or_else(|e| {
        tracing::error!("Failed to build HTTP client, using defaults: {}", e);
        Client::new()
    })
}

/// Create the client used by the forwarding route.
///
/// No overall timeout: the route bounds the wait for response headers itself
/// and the body is streamed for as long as the upstream keeps sending.
/// Header names go out title-cased so `session-id` reaches the backend as
/// `Session-Id`.
pub fn create_upstream_client() -> reqwest::Result<Client> {
    Client::builder()
        .http1_title_case_headers()
        .no_gzip()
        .no_brotli()
        .no_deflate()
        .build()
}
