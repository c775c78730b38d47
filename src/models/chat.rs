use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One entry of the conversation, persisted under `chatMessages`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_typing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<String>>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            is_typing: None,
            steps: None,
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            text: text.into(),
            is_typing: None,
            steps: None,
        }
    }

    /// Empty agent message shown while a reply is pending
    pub fn typing_placeholder() -> Self {
        Self {
            role: Role::Agent,
            text: String::new(),
            is_typing: Some(true),
            steps: None,
        }
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing.unwrap_or(false)
    }
}

/// Use case selector; decides which backend endpoint a prompt goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Classification,
    Reasoning,
    #[default]
    Freeform,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Classification => "classification",
            ChatMode::Reasoning => "reasoning",
            ChatMode::Freeform => "freeform",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classification" => Ok(ChatMode::Classification),
            "reasoning" => Ok(ChatMode::Reasoning),
            "freeform" => Ok(ChatMode::Freeform),
            other => Err(format!(
                "Unknown mode: {} (expected classification, reasoning or freeform)",
                other
            )),
        }
    }
}
