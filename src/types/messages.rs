//! Conversation message types
//!
//! Messages belong to a conversation (the active context), are appended in
//! arrival order and never change after creation, except for replacing an
//! optimistic local entry with the server's copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identifiers::{ContextId, MessageId};

// ============================================================================
// Message Types
// ============================================================================

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human user
    User,
    /// Model reply
    Assistant,
    /// System instruction
    System,
}

/// Message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Server id (`0` while the message is still pending)
    pub id: MessageId,
    /// Conversation this message belongs to
    #[serde(rename = "chat_id")]
    pub context_id: ContextId,
    /// Author
    pub role: Role,
    /// Text content
    pub content: String,
    /// Backend metadata (provider, token usage, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_json: Option<serde_json::Value>,
    /// Creation time
    #[serde(deserialize_with = "super::timestamp::utc")]
    pub created_at: DateTime<Utc>,
    /// Local key of an optimistic insert awaiting the server's copy
    #[serde(skip)]
    pub pending: Option<Uuid>,
}

impl Message {
    /// Create a local, not yet confirmed user message
    pub fn pending_user(context_id: ContextId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(0),
            context_id,
            role: Role::User,
            content: content.into(),
            meta_json: None,
            created_at: Utc::now(),
            pending: Some(Uuid::new_v4()),
        }
    }

    /// Whether this is an optimistic entry not yet confirmed by the backend
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Role/content pair sent as completion history
    #[must_use]
    pub fn as_input(&self) -> MessageInput {
        MessageInput {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Message body accepted by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInput {
    /// Author
    pub role: Role,
    /// Text content
    pub content: String,
}

// ============================================================================
// Completion
// ============================================================================

/// Optional overrides for a completion call
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletionOptions {
    /// Model to use instead of the chat's default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Provider-specific settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
}

/// Body of `POST /chats/{id}/completion`
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CompletionRequest {
    pub messages: Vec<MessageInput>,
    #[serde(flatten)]
    pub options: CompletionOptions,
}

/// Response of `POST /chats/{id}/completion`
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    /// Stored assistant message
    pub message: Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_decodes_backend_shape() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "id": 11,
            "chat_id": 5,
            "role": "assistant",
            "content": "hi",
            "created_at": "2025-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(msg.context_id, ContextId::new(5));
        assert_eq!(msg.role, Role::Assistant);
        assert!(!msg.is_pending());
    }

    #[test]
    fn test_completion_request_flattens_options() {
        let request = CompletionRequest {
            messages: vec![MessageInput {
                role: Role::User,
                content: "summarise".into(),
            }],
            options: CompletionOptions {
                model: Some("gemini-1.5-pro".into()),
                settings: None,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gemini-1.5-pro");
        assert!(json.get("settings").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
