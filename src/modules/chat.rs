use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult, RelayError};
use crate::models::{ChatMode, ClientConfig};
use crate::modules::auth::{self, Credentials};
use crate::modules::conversation::Conversation;
use crate::modules::relay::{RelayClient, RelayReply};
use crate::modules::storage::LocalStore;
use crate::modules::token::TokenStore;

/// Result of a submitted prompt that did not block the front end
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Blank input, nothing sent
    Ignored,
    Replied(RelayReply),
    /// Shown inline as an agent message
    Failed(RelayError),
}

/// Front-end controller tying the token store, relay client and conversation together
pub struct ChatService {
    http_client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    typing_delay: Duration,
    tokens: TokenStore,
    relay: RelayClient,
    conversation: Conversation,
}

impl ChatService {
    pub fn new(config: &ClientConfig, store: Arc<LocalStore>) -> AppResult<Self> {
        let http_client = crate::utils::http::create_client(config.request_timeout_secs);
        let relay = RelayClient::new(http_client.clone(), config.base_url.clone());
        let conversation = Conversation::load(store.clone())?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
            credentials: Credentials {
                username: config.username.clone(),
                password: config.password.clone(),
            },
            typing_delay: Duration::from_millis(config.typing_delay_ms),
            tokens: TokenStore::new(store),
            relay,
            conversation,
        })
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub async fn has_token(&self) -> bool {
        self.tokens.current().await.is_some()
    }

    /// One-time login on start; an error here blocks the front end
    pub async fn authenticate(&self) -> AppResult<()> {
        let client = &self.http_client;
        let base_url = self.base_url.as_str();
        let credentials = &self.credentials;
        self.tokens
            .ensure_token(|| auth::login(client, base_url, credentials))
            .await
            .map(|_| ())
    }

    /// Re-run authentication after an expired session
    pub async fn reload(&self) -> AppResult<()> {
        tracing::info!("[auth] reloading session");
        self.authenticate().await
    }

    /// Send one prompt and record the reply (or the failure) in the conversation.
    ///
    /// Returns `AppError::Auth` when no token is held; every other failure is
    /// recorded inline and returned as `SubmitOutcome::Failed`.
    pub async fn submit<F>(&mut self, input: &str, mode: ChatMode, on_frame: F) -> AppResult<SubmitOutcome>
    where
        F: FnMut(&str),
    {
        let token = match self.tokens.current().await {
            Some(token) => token,
            None => return Err(AppError::Auth(RelayError::AuthRequired.to_string())),
        };

        let prompt = input.trim();
        if prompt.is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }

        self.conversation.begin_turn(prompt)?;

        let result = self
            .relay
            .send(prompt, mode, &token, self.conversation.session_id())
            .await;

        match result {
            Ok(reply) => {
                self.conversation.apply_context(reply.context.clone());
                self.conversation
                    .type_out(&reply.summary, reply.steps.clone(), self.typing_delay, on_frame)
                    .await?;
                Ok(SubmitOutcome::Replied(reply))
            }
            Err(e) => {
                tracing::error!("[chat] failure: {}", e);
                if e.clears_token() {
                    self.tokens.discard_stored()?;
                }
                self.conversation.fail_turn(&e.to_string())?;
                Ok(SubmitOutcome::Failed(e))
            }
        }
    }

    pub fn reset(&mut self) -> AppResult<()> {
        self.conversation.reset()
    }
}
