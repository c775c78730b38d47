use crate::proxy::{upstream::UpstreamClient, ProxyConfig};
use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Json, Response},
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Axum application state
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    /// Normalised mount point, stripped from the request path before forwarding
    pub route_prefix: Arc<String>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(config: &ProxyConfig) -> Result<Self, String> {
        let upstream = UpstreamClient::new(config).map_err(|e| e.to_string())?;
        Ok(Self {
            upstream: Arc::new(upstream),
            route_prefix: Arc::new(config.normalized_prefix()),
            max_body_bytes: config.max_body_bytes,
        })
    }
}

/// Build the router: catch-all forwarding under the prefix plus `/healthz`
pub fn build_router(state: AppState) -> Router {
    use crate::proxy::handlers;

    let prefix = state.route_prefix.as_str().to_string();
    let max_body_bytes = state.max_body_bytes;
    let root = if prefix.is_empty() { "/".to_string() } else { prefix.clone() };

    Router::new()
        .route("/healthz", get(health_check_handler))
        .route(&format!("{}/*path", prefix), any(handlers::handle_forward))
        .route(&root, any(handlers::handle_forward))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
    local_addr: SocketAddr,
}

impl AxumServer {
    /// Start Axum server
    pub async fn start(
        config: &ProxyConfig,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), String> {
        config.validate()?;
        let state = AppState::new(config)?;

        if config.backend_server.is_none() {
            tracing::warn!(
                "{} is not set; forwarded requests will fail until it is configured",
                crate::proxy::config::BACKEND_ENV
            );
        }

        let app = build_router(state);

        // Bind address
        let addr = format!("{}:{}", config.get_bind_address(), config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind address {}: {}", addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        tracing::info!(
            "Forwarding proxy started at http://{}{} -> {}",
            local_addr,
            config.normalized_prefix(),
            config.base_url().unwrap_or("<unset>")
        );

        // Create shutdown channel
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let server_instance = Self {
            shutdown_tx: Some(shutdown_tx),
            local_addr,
        };

        // Start server in new task
        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection handling finished or errored: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Forwarding proxy stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((server_instance, handle))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop server
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Health check handler
async fn health_check_handler() -> Response {
    Json(serde_json::json!({
        "status": "ok"
    }))
    .into_response()
}
