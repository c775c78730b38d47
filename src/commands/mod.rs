use std::sync::Arc;

use crate::error::AppResult;
use crate::modules::auth::{self, Credentials};
use crate::modules::conversation::Conversation;
use crate::modules::LocalStore;

pub mod chat;
pub mod proxy;

/// Probe the login endpoint once and describe the outcome
pub async fn probe_login(base_url: &str, credentials: &Credentials, timeout_secs: u64) -> String {
    let client = crate::utils::http::create_client(timeout_secs);
    match auth::login(&client, base_url, credentials).await {
        Ok(token) => format!(
            "Success! Token: {}...",
            token.chars().take(50).collect::<String>()
        ),
        Err(e) => format!("Error: {}", e),
    }
}

/// Clear stored messages and start a new session id
pub fn reset_local_state(store: Arc<LocalStore>) -> AppResult<String> {
    let mut conversation = Conversation::load(store)?;
    conversation.reset()?;
    Ok(conversation.session_id().to_string())
}

/// Clear log files
pub fn clear_log_cache() -> Result<(), String> {
    crate::modules::logger::clear_logs()
}
