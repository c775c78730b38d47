use crate::proxy::{AxumServer, ProxyConfig};
use serde::{Deserialize, Serialize};

/// Proxy service status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyStatus {
    pub running: bool,
    pub port: u16,
    pub base_url: String,
    pub backend: Option<String>,
    pub timeout_ms: u64,
}

/// Proxy service instance
pub struct ProxyServiceInstance {
    pub config: ProxyConfig,
    pub axum_server: AxumServer,
    pub server_handle: tokio::task::JoinHandle<()>,
}

/// Start proxy service
pub async fn start_proxy_service(
    config: ProxyConfig,
) -> Result<(ProxyServiceInstance, ProxyStatus), String> {
    let (axum_server, server_handle) = AxumServer::start(&config)
        .await
        .map_err(|e| format!("Failed to start Axum server: {}", e))?;

    let addr = axum_server.local_addr();
    let status = ProxyStatus {
        running: true,
        port: addr.port(),
        base_url: format!("http://{}{}", addr, config.normalized_prefix()),
        backend: config.base_url().map(str::to_string),
        timeout_ms: config.timeout_ms,
    };

    let instance = ProxyServiceInstance {
        config,
        axum_server,
        server_handle,
    };

    Ok((instance, status))
}

/// Stop proxy service and wait for the accept loop to finish
pub async fn stop_proxy_service(instance: ProxyServiceInstance) -> Result<(), String> {
    instance.axum_server.stop();
    instance
        .server_handle
        .await
        .map_err(|e| format!("Proxy task ended abnormally: {}", e))
}

/// Run the proxy until Ctrl-C
pub async fn run_proxy_service(config: ProxyConfig) -> anyhow::Result<()> {
    let (instance, status) = start_proxy_service(config)
        .await
        .map_err(anyhow::Error::msg)?;

    println!("{}", serde_json::to_string_pretty(&status)?);

    tokio::signal::ctrl_c().await?;
    tracing::info!(
        "Shutting down forwarding proxy on port {}",
        instance.config.port
    );
    stop_proxy_service(instance).await.map_err(anyhow::Error::msg)
}
