use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ContextSnapshot, ContextUpdate, Message};
use crate::modules::storage::{LocalStore, MESSAGES_KEY, SESSION_KEY};

pub const INTRO_TEXT: &str = "Hi there! To get started, can you tell me your email or phone number so I can look up your loyalty profile?";

/// Conversation history, session id and the latest context snapshot.
///
/// History and session id are mirrored into local storage after each change.
pub struct Conversation {
    store: Arc<LocalStore>,
    session_id: String,
    messages: Vec<Message>,
    context: Option<ContextSnapshot>,
}

impl Conversation {
    /// Restore the session id and history, seeding the intro message
    pub fn load(store: Arc<LocalStore>) -> AppResult<Self> {
        let session_id = store
            .get(SESSION_KEY)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(new_session_id);

        let mut messages: Vec<Message> = match store.get(MESSAGES_KEY) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable chat history: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        if messages.is_empty() {
            messages.push(Message::agent(INTRO_TEXT));
        }

        let conversation = Self {
            store,
            session_id,
            messages,
            context: None,
        };
        conversation.store.set(SESSION_KEY, conversation.session_id.clone())?;
        conversation.persist()?;
        Ok(conversation)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn context(&self) -> Option<&ContextSnapshot> {
        self.context.as_ref()
    }

    pub fn apply_context(&mut self, update: ContextUpdate) {
        match update {
            ContextUpdate::Replace(data) => self.context = Some(ContextSnapshot::new(data)),
            ContextUpdate::Clear => self.context = None,
            ContextUpdate::Keep => {}
        }
    }

    /// Append the user's message and a typing placeholder for the reply
    pub fn begin_turn(&mut self, user_text: &str) -> AppResult<()> {
        self.messages.push(Message::user(user_text));
        self.messages.push(Message::typing_placeholder());
        self.persist()
    }

    /// Reveal `text` one character at a time, then finalize the last message.
    ///
    /// `on_frame` receives every growing prefix of `text`.
    pub async fn type_out<F>(
        &mut self,
        text: &str,
        steps: Vec<String>,
        delay: Duration,
        mut on_frame: F,
    ) -> AppResult<()>
    where
        F: FnMut(&str),
    {
        let mut displayed = String::with_capacity(text.len());
        for ch in text.chars() {
            displayed.push(ch);
            if let Some(last) = self.messages.last_mut() {
                last.text.clone_from(&displayed);
                last.is_typing = Some(true);
            }
            on_frame(&displayed);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        match self.messages.last_mut() {
            Some(last) => {
                last.text = text.to_string();
                last.is_typing = Some(false);
                last.steps = Some(steps);
            }
            None => {
                let mut msg = Message::agent(text);
                msg.is_typing = Some(false);
                msg.steps = Some(steps);
                self.messages.push(msg);
            }
        }
        self.persist()
    }

    /// Replace the pending reply with an inline error
    pub fn fail_turn(&mut self, message: &str) -> AppResult<()> {
        let failed = Message::agent(format!("❌ {}", message));
        match self.messages.last_mut() {
            Some(last) => *last = failed,
            None => self.messages.push(failed),
        }
        self.persist()
    }

    /// Drop history and context and start a new session
    pub fn reset(&mut self) -> AppResult<()> {
        self.store.remove(MESSAGES_KEY)?;
        self.store.remove(SESSION_KEY)?;
        self.messages.clear();
        self.context = None;
        self.session_id = new_session_id();
        self.store.set(SESSION_KEY, self.session_id.clone())?;
        tracing::info!("[chat] conversation reset, new session {}", self.session_id);
        Ok(())
    }

    fn persist(&self) -> AppResult<()> {
        let raw = serde_json::to_string(&self.messages)?;
        self.store.set(MESSAGES_KEY, raw)
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}
