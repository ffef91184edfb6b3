//! Chat endpoint request types.

use serde::{Deserialize, Serialize};

/// Message role in a chat conversation.
///
/// Unknown roles deserialize to [`Role::Other`] instead of failing the whole
/// request; the server silently drops such messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// One message in the client-supplied conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/ai/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation history, oldest first.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    /// Model identifier; empty or absent resolves to the configured default.
    #[serde(default)]
    pub model: Option<String>,

    /// Accepted for wire compatibility. The endpoint always streams.
    #[serde(default)]
    pub stream: Option<bool>,
}
