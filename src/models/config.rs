use crate::models::ChatMode;
use crate::proxy::ProxyConfig;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            proxy: ProxyConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Chat client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL; defaults to the local forwarding route
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default)]
    pub default_mode: ChatMode,

    /// Delay between typed characters (milliseconds)
    #[serde(default = "default_typing_delay")]
    pub typing_delay_ms: u64,

    /// Relay request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: default_username(),
            password: default_password(),
            default_mode: ChatMode::default(),
            typing_delay_ms: default_typing_delay(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000/api/mcp".to_string()
}

fn default_username() -> String {
    "chatbot".to_string()
}

fn default_password() -> String {
    "chatbot".to_string()
}

fn default_typing_delay() -> u64 {
    15
}

fn default_request_timeout() -> u64 {
    120
}
