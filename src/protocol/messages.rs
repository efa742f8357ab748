//! Chat message types for routing conversations
//!
//! A conversation is an ordered list of [`ChatMessage`]s. Resolvers always send
//! a system prompt first, then the caller's [`Context`] history, then the new
//! [`UserMessage`].
//!
//! # Examples
//! ```
//! use agent_router::protocol::{ChatMessage, Context, UserMessage};
//!
//! let context = Context::new(vec![
//!     ChatMessage::user("Hi"),
//!     ChatMessage::assistant("Hello! How can I help?"),
//! ]);
//! let input = UserMessage::new("I want to buy a new phone");
//!
//! assert_eq!(context.previous_messages.len(), 2);
//! assert_eq!(ChatMessage::from(input).role(), "user");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single message in a conversation, tagged by role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum ChatMessage {
    User(String),
    System(String),
    Assistant(String),
}

/// Raised when a role string is not one of user/system/assistant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown message role: {0}")]
pub struct UnknownRoleError(pub String);

impl ChatMessage {
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::User(content.into())
    }

    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::System(content.into())
    }

    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::Assistant(content.into())
    }

    /// Build a message from a wire role name
    pub fn from_role<S: Into<String>>(role: &str, content: S) -> Result<Self, UnknownRoleError> {
        match role {
            "user" => Ok(Self::User(content.into())),
            "system" => Ok(Self::System(content.into())),
            "assistant" => Ok(Self::Assistant(content.into())),
            other => Err(UnknownRoleError(other.to_string())),
        }
    }

    /// Wire role name
    pub fn role(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::System(_) => "system",
            Self::Assistant(_) => "assistant",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::User(content) | Self::System(content) | Self::Assistant(content) => content,
        }
    }

    pub fn into_content(self) -> String {
        match self {
            Self::User(content) | Self::System(content) | Self::Assistant(content) => content,
        }
    }
}

/// The new user utterance to route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub content: String,
}

impl UserMessage {
    pub fn new<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl From<UserMessage> for ChatMessage {
    fn from(message: UserMessage) -> Self {
        ChatMessage::User(message.content)
    }
}

/// Read-only conversation history supplied per call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Time-ordered prior messages
    #[serde(default)]
    pub previous_messages: Vec<ChatMessage>,
}

impl Context {
    pub fn new(previous_messages: Vec<ChatMessage>) -> Self {
        Self { previous_messages }
    }

    /// Context with no history
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Assemble the outbound conversation: system prompt, history, then the input
pub fn build_conversation(
    system_prompt: String,
    context: &Context,
    input: &UserMessage,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(context.previous_messages.len() + 2);
    messages.push(ChatMessage::System(system_prompt));
    messages.extend(context.previous_messages.iter().cloned());
    messages.push(ChatMessage::from(input.clone()));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_role() {
        assert_eq!(
            ChatMessage::from_role("user", "hi").unwrap(),
            ChatMessage::user("hi")
        );
        assert_eq!(
            ChatMessage::from_role("system", "rules").unwrap(),
            ChatMessage::system("rules")
        );
        assert_eq!(
            ChatMessage::from_role("assistant", "ok").unwrap(),
            ChatMessage::assistant("ok")
        );

        let error = ChatMessage::from_role("tool", "x").unwrap_err();
        assert_eq!(error, UnknownRoleError("tool".to_string()));
    }

    #[test]
    fn test_role_and_content_accessors() {
        let message = ChatMessage::assistant("answer");
        assert_eq!(message.role(), "assistant");
        assert_eq!(message.content(), "answer");
        assert_eq!(message.into_content(), "answer");
    }

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_string(&ChatMessage::system("You route agents")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"You route agents"}"#);

        let parsed: ChatMessage =
            serde_json::from_str(r#"{"role":"user","content":"Hello"}"#).unwrap();
        assert_eq!(parsed, ChatMessage::user("Hello"));
    }

    #[test]
    fn test_context_deserializes_without_history() {
        let context: Context = serde_json::from_str("{}").unwrap();
        assert!(context.previous_messages.is_empty());
    }

    #[test]
    fn test_build_conversation_orders_messages() {
        let context = Context::new(vec![
            ChatMessage::user("earlier question"),
            ChatMessage::assistant("earlier answer"),
        ]);
        let input = UserMessage::new("new question");

        let messages = build_conversation("prompt".to_string(), &context, &input);

        assert_eq!(
            messages,
            vec![
                ChatMessage::system("prompt"),
                ChatMessage::user("earlier question"),
                ChatMessage::assistant("earlier answer"),
                ChatMessage::user("new question"),
            ]
        );
    }
}
