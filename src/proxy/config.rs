use serde::{Deserialize, Serialize};

pub const BACKEND_ENV: &str = "MCP_BACKEND_SERVER";
pub const TIMEOUT_ENV: &str = "MCP_PROXY_TIMEOUT_MS";

/// Forwarding proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Upstream base URL. Requests fail with 500 while unset.
    #[serde(default)]
    pub backend_server: Option<String>,

    /// Upstream timeout (milliseconds), applied until response headers arrive
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether to allow LAN access
    /// - false: 127.0.0.1 only (default)
    /// - true: 0.0.0.0
    #[serde(default)]
    pub allow_lan_access: bool,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Mount point of the catch-all route
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            backend_server: None,
            timeout_ms: default_timeout_ms(),
            allow_lan_access: false,
            port: default_port(),
            route_prefix: default_route_prefix(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_port() -> u16 {
    3000
}

fn default_route_prefix() -> String {
    "/api/mcp".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl ProxyConfig {
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }

    /// Overlay `MCP_BACKEND_SERVER` and `MCP_PROXY_TIMEOUT_MS` from the environment
    pub fn apply_env(&mut self) {
        self.apply_vars(
            std::env::var(BACKEND_ENV).ok(),
            std::env::var(TIMEOUT_ENV).ok(),
        );
    }

    fn apply_vars(&mut self, backend: Option<String>, timeout: Option<String>) {
        if let Some(base) = backend.filter(|b| !b.trim().is_empty()) {
            self.backend_server = Some(base.trim().to_string());
        }

        if let Some(raw) = timeout {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.timeout_ms = ms,
                _ => tracing::warn!(
                    "Ignoring invalid {}={:?}, keeping {}ms",
                    TIMEOUT_ENV,
                    raw,
                    self.timeout_ms
                ),
            }
        }
    }

    /// Base URL with a single trailing slash removed
    pub fn base_url(&self) -> Option<&str> {
        self.backend_server.as_deref().map(|b| b.strip_suffix('/').unwrap_or(b))
    }

    /// Route prefix normalised to a leading slash and no trailing slash
    pub fn normalized_prefix(&self) -> String {
        let trimmed = self.route_prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(base) = self.base_url() {
            url::Url::parse(base).map_err(|e| format!("Invalid backend URL {}: {}", base, e))?;
        }
        Ok(())
    }
}
