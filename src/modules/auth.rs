use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "chatbot".to_string(),
            password: "chatbot".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub detail: Option<Value>,
}

impl AuthResponse {
    /// Parse a login body, tolerating empty or non-JSON payloads
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        serde_json::from_str(raw).unwrap_or_default()
    }

    fn detail_message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Null | Value::String(_) => None,
            other => Some(other.to_string()),
        }
    }
}

/// Log in against `{base_url}/auth/login` and return the bearer token
pub async fn login(client: &Client, base_url: &str, credentials: &Credentials) -> AppResult<String> {
    let base = base_url.trim_end_matches('/');
    let url = format!("{}{}", base, LOGIN_PATH);

    tracing::info!("[auth] POST {}", url);

    let response = client
        .post(&url)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json")
        .json(credentials)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("[auth] failure: {}", e);
            AppError::Auth(format!(
                "Network error: Cannot connect to MCP server at {}. Please check if the server is running.",
                base
            ))
        })?;

    let status = response.status();
    tracing::info!("[auth] status: {}", status.as_u16());

    let raw = response.text().await.unwrap_or_default();
    let data = AuthResponse::parse_lenient(&raw);

    if !status.is_success() {
        tracing::error!("[auth] error body: {}", raw);
        return Err(AppError::Auth(data.detail_message().unwrap_or_else(|| {
            format!("Authentication failed: {}", status.as_u16())
        })));
    }

    match data.access_token {
        Some(token) if !token.is_empty() => {
            tracing::info!(
                "[auth] token received: {}...",
                token.chars().take(20).collect::<String>()
            );
            Ok(token)
        }
        _ => Err(AppError::Auth("No access token received".to_string())),
    }
}
