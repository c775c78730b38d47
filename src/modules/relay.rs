// Relay client: sends a prompt to the context endpoint picked by mode
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;

use crate::error::RelayError;
use crate::models::{ChatMode, ContextUpdate};
use crate::modules::token::is_token_expired;

/// Correlation header carried on every relay request
pub const SESSION_HEADER: &str = "Session-Id";

/// An email address or a phone/member number
static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@|[0-9]{6,}").expect("static identifier pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Agent,
    Reason,
    Freeform,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Agent => "/context/agent",
            Endpoint::Reason => "/context/reason",
            Endpoint::Freeform => "/context/freeform",
        }
    }
}

pub fn is_identifier(input: &str) -> bool {
    IDENTIFIER_RE.is_match(input)
}

/// Freeform always goes to the freeform endpoint; reasoning goes to the
/// reasoning endpoint unless the input looks like an identifier, which
/// (like classification) goes to the agent endpoint.
pub fn select_endpoint(mode: ChatMode, input: &str) -> Endpoint {
    match mode {
        ChatMode::Freeform => Endpoint::Freeform,
        ChatMode::Reasoning if !is_identifier(input) => Endpoint::Reason,
        ChatMode::Reasoning | ChatMode::Classification => Endpoint::Agent,
    }
}

/// Successful reply extracted from the backend envelope
#[derive(Debug, Clone, PartialEq)]
pub struct RelayReply {
    pub summary: String,
    pub steps: Vec<String>,
    pub context: ContextUpdate,
}

/// Backend JSON envelope; the payload lives either under `response` or at the top level
#[derive(Debug, Clone, Default)]
pub struct ChatEnvelope(Value);

impl ChatEnvelope {
    /// Parse a response body; anything that is not a JSON object or array
    /// becomes an empty envelope
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::empty();
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(v @ (Value::Object(_) | Value::Array(_))) => Self(v),
            Ok(_) => Self::empty(),
            Err(_) => {
                let preview: String = raw.chars().take(500).collect();
                tracing::error!("[chat] non-JSON body: {}", preview);
                Self::empty()
            }
        }
    }

    fn empty() -> Self {
        Self(Value::Object(Default::default()))
    }

    fn response(&self) -> Option<&Value> {
        self.0.get("response").filter(|v| !v.is_null())
    }

    fn nested(&self, key: &str) -> Option<&Value> {
        self.response().and_then(|r| r.get(key))
    }

    pub fn detail(&self) -> Option<String> {
        truthy_text(self.0.get("detail")?)
    }

    pub fn error(&self) -> Option<String> {
        truthy_text(self.nested("error")?)
    }

    /// `response.summary`, then `summary`, then the raw payload as JSON
    pub fn summary(&self) -> String {
        fn pick(v: Option<&Value>) -> Option<&str> {
            v.and_then(|s| s.as_str()).filter(|s| !s.is_empty())
        }
        if let Some(s) = pick(self.nested("summary")).or_else(|| pick(self.0.get("summary"))) {
            return s.to_string();
        }
        let payload = self.response().filter(|r| is_truthy(r)).unwrap_or(&self.0);
        payload.to_string()
    }

    /// First array found at `response.steps` or `steps`
    pub fn steps(&self) -> Vec<String> {
        let steps = self
            .nested("steps")
            .filter(|v| is_truthy(v))
            .or_else(|| self.0.get("steps").filter(|v| is_truthy(v)));

        match steps {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// `response.context` unless null or absent, else top-level `context`
    pub fn context(&self) -> ContextUpdate {
        let candidate = self
            .nested("context")
            .filter(|v| !v.is_null())
            .or_else(|| self.0.get("context"));
        ContextUpdate::from_value(candidate)
    }

    pub fn into_reply(self) -> Result<RelayReply, RelayError> {
        if let Some(error) = self.error() {
            return Err(RelayError::Request(error));
        }
        Ok(RelayReply {
            summary: self.summary(),
            steps: self.steps(),
            context: self.context(),
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy_text(value: &Value) -> Option<String> {
    if !is_truthy(value) {
        return None;
    }
    Some(match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Map a non-success status to its relay error category
pub fn classify_status(status: StatusCode, envelope: &ChatEnvelope) -> RelayError {
    match status {
        StatusCode::UNAUTHORIZED => RelayError::Unauthorized,
        StatusCode::FORBIDDEN => RelayError::AccessDenied,
        other => RelayError::Request(
            envelope
                .detail()
                .unwrap_or_else(|| format!("Request failed: {}", other.as_u16())),
        ),
    }
}

pub struct RelayClient {
    http_client: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(http_client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// Relay one prompt.
    ///
    /// An expired token fails before any network call.
    pub async fn send(
        &self,
        prompt: &str,
        mode: ChatMode,
        token: &str,
        session_id: &str,
    ) -> Result<RelayReply, RelayError> {
        if is_token_expired(token) {
            return Err(RelayError::SessionExpired);
        }

        let endpoint = select_endpoint(mode, prompt);
        let url = self.endpoint_url(endpoint);
        tracing::info!("[chat] POST {} (mode: {})", url, mode);

        let response = self
            .http_client
            .post(&url)
            .query(&[("prompt", prompt)])
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(SESSION_HEADER, session_id)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("[chat] failure: {}", e);
                RelayError::Network(format!("Request failed: {}", e))
            })?;

        let status = response.status();
        tracing::info!("[chat] status: {}", status.as_u16());

        let raw = response.text().await.unwrap_or_default();
        let envelope = ChatEnvelope::parse_lenient(&raw);

        if !status.is_success() {
            return Err(classify_status(status, &envelope));
        }

        envelope.into_reply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifier_heuristic() {
        assert!(is_identifier("jane@example.com"));
        assert!(is_identifier("my number is 5551234567"));
        assert!(is_identifier("member 123456"));
        assert!(!is_identifier("12345"));
        assert!(!is_identifier("what offers do I have?"));
        assert!(!is_identifier("12-34-56"));
    }

    #[test]
    fn test_endpoint_selection_matrix() {
        let question = "which campaigns fit me?";
        let email = "jane@example.com";

        assert_eq!(select_endpoint(ChatMode::Freeform, question), Endpoint::Freeform);
        assert_eq!(select_endpoint(ChatMode::Freeform, email), Endpoint::Freeform);
        assert_eq!(select_endpoint(ChatMode::Reasoning, question), Endpoint::Reason);
        assert_eq!(select_endpoint(ChatMode::Reasoning, email), Endpoint::Agent);
        assert_eq!(select_endpoint(ChatMode::Classification, question), Endpoint::Agent);
        assert_eq!(select_endpoint(ChatMode::Classification, email), Endpoint::Agent);
    }

    #[test]
    fn test_nested_envelope() {
        let env = ChatEnvelope::parse_lenient(
            &json!({
                "response": {
                    "summary": "You have 3 offers.",
                    "steps": ["lookup member", "rank offers"],
                    "context": {"offers": [1, 2, 3]}
                },
                "summary": "ignored"
            })
            .to_string(),
        );
        let reply = env.into_reply().unwrap();
        assert_eq!(reply.summary, "You have 3 offers.");
        assert_eq!(reply.steps, vec!["lookup member", "rank offers"]);
        assert!(matches!(reply.context, ContextUpdate::Replace(ref m) if m.contains_key("offers")));
    }

    #[test]
    fn test_top_level_envelope() {
        let env = ChatEnvelope::parse_lenient(
            &json!({"summary": "Hello", "steps": ["a"], "context": null}).to_string(),
        );
        let reply = env.into_reply().unwrap();
        assert_eq!(reply.summary, "Hello");
        assert_eq!(reply.steps, vec!["a"]);
        assert_eq!(reply.context, ContextUpdate::Clear);
    }

    #[test]
    fn test_nested_null_context_falls_back_to_top_level() {
        let env = ChatEnvelope::parse_lenient(
            &json!({"response": {"summary": "x", "context": null}, "context": {"timeline": []}})
                .to_string(),
        );
        assert!(matches!(env.context(), ContextUpdate::Replace(_)));

        let keep = ChatEnvelope::parse_lenient(&json!({"summary": "x", "context": [1]}).to_string());
        assert_eq!(keep.context(), ContextUpdate::Keep);
    }

    #[test]
    fn test_summary_falls_back_to_json() {
        let env = ChatEnvelope::parse_lenient(&json!({"response": {"answer": 42}}).to_string());
        assert_eq!(env.summary(), r#"{"answer":42}"#);

        let bare = ChatEnvelope::parse_lenient(&json!({"answer": 42}).to_string());
        assert_eq!(bare.summary(), r#"{"answer":42}"#);

        assert_eq!(ChatEnvelope::parse_lenient("not json").summary(), "{}");
    }

    #[test]
    fn test_blank_nested_summary_uses_top_level() {
        let env = ChatEnvelope::parse_lenient(
            &json!({"response": {"summary": "", "steps": []}, "summary": "From the top"}).to_string(),
        );
        assert_eq!(env.summary(), "From the top");

        let numeric = ChatEnvelope::parse_lenient(&json!({"response": {"summary": 7}}).to_string());
        assert_eq!(numeric.summary(), r#"{"summary":7}"#);
    }

    #[test]
    fn test_empty_nested_steps_win_over_top_level() {
        let env = ChatEnvelope::parse_lenient(
            &json!({"response": {"summary": "s", "steps": []}, "steps": ["top"]}).to_string(),
        );
        assert!(env.steps().is_empty());
    }

    #[test]
    fn test_embedded_error() {
        let env = ChatEnvelope::parse_lenient(
            &json!({"response": {"error": "Member not found"}}).to_string(),
        );
        assert_eq!(
            env.into_reply().unwrap_err(),
            RelayError::Request("Member not found".into())
        );
    }

    #[test]
    fn test_status_mapping() {
        let with_detail = ChatEnvelope::parse_lenient(r#"{"detail":"Prompt too long"}"#);
        let empty = ChatEnvelope::parse_lenient("");

        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, &with_detail),
            RelayError::Unauthorized
        );
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, &with_detail),
            RelayError::AccessDenied
        );
        assert_eq!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, &with_detail),
            RelayError::Request("Prompt too long".into())
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, &empty),
            RelayError::Request("Request failed: 500".into())
        );
    }

    #[tokio::test]
    async fn test_expired_token_fails_without_request() {
        // Unroutable base: a network call would error differently
        let client = RelayClient::new(Client::new(), "http://127.0.0.1:9/api/mcp/");
        assert_eq!(client.base_url(), "http://127.0.0.1:9/api/mcp");

        let expired = crate::modules::token::tests::token_expiring_in(-10);
        let err = client
            .send("hello", ChatMode::Freeform, &expired, "session")
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::SessionExpired);
    }
}
