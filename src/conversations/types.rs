//! Conversation data model
//!
//! Wire and persisted JSON both use camelCase field names, matching the
//! stored document layout under
//! `conversations/users/{userId}/conversations/{conversationId}.json`.

use serde::{Deserialize, Serialize};

/// Metadata describing one stored conversation
///
/// `id` is stable across updates. `title` and `preview_text` derive from
/// the first user message at save time and are never recomputed afterward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMetadata {
    /// UUID for this conversation
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// First user message, truncated to 50 characters
    pub title: String,
    /// Creation timestamp (epoch milliseconds)
    pub created_at: i64,
    /// Last update timestamp (epoch milliseconds)
    pub updated_at: i64,
    /// Total messages in the conversation
    pub message_count: usize,
    /// Full first user message for display
    pub preview_text: String,
}

/// A full persisted conversation record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConversation {
    pub metadata: ConversationMetadata,
    pub messages: Vec<UiMessage>,
    /// Questionnaire-derived context attached on the first save, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_messages: Option<Vec<ContextMessage>>,
}

/// Per-user directory of conversation metadata, most recent first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConversationIndex {
    pub user_id: String,
    pub conversations: Vec<ConversationMetadata>,
    pub last_modified: i64,
}

/// One chat message as the client holds it: an ordered list of parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiMessage {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl UiMessage {
    /// Creates a user message with a single text part
    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: "user".to_string(),
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    /// Creates an assistant message with a single text part
    pub fn assistant(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: "assistant".to_string(),
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    /// Concatenated text content of all text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// One part of a streamed or stored message
///
/// The part sequence preserves the provider's emission order: citations
/// precede the text span they support, and source-url parts carry the
/// aggregated search results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    SourceUrl {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Citation {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    ToolUse {
        name: String,
    },
}

/// A question/answer pair from the onboarding questionnaire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextMessage {
    pub question: String,
    pub answer: String,
}
