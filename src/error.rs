use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    // Blocking state: the front end cannot continue without a token
    #[error("{0}")]
    Auth(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// Serialize as the display string so errors can be embedded in JSON output
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Failure categories of a relayed chat request.
///
/// Everything except `AuthRequired` is shown inline as an agent message;
/// `AuthRequired` blocks the front end until the user reloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Unable to authenticate with backend. Please refresh the page.")]
    AuthRequired,

    // Token expired locally before the request was sent
    #[error("Session expired. Please refresh the page.")]
    SessionExpired,

    // Backend answered 401
    #[error("Authentication expired. Please refresh the page.")]
    Unauthorized,

    #[error("Access denied. Insufficient permissions.")]
    AccessDenied,

    #[error("{0}")]
    Request(String),

    #[error("{0}")]
    Network(String),
}

impl RelayError {
    /// True when the stored token must be discarded
    pub fn clears_token(&self) -> bool {
        matches!(self, RelayError::Unauthorized)
    }
}

/// Failures of the forwarding route, rendered as `{"detail": ...}`
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("MCP_BACKEND_SERVER is not set. Configure it in your hosting provider env settings.")]
    BackendNotConfigured,

    #[error("Upstream timeout after {0}ms")]
    Timeout(u64),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    BadRequest(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BackendNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Timeout(_) | ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (self.status(), body).into_response()
    }
}
