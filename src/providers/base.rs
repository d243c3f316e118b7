//! Base provider trait and common streaming types
//!
//! Defines the ChatProvider trait that streaming AI providers implement,
//! along with the provider-facing message type, the assembled request,
//! and the normalized stream events the server forwards to clients.

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Message structure for the provider conversation
///
/// Flattened text turns, already wrapped in any delimiting markers the
/// caller applies. Providers see only `user` and `assistant` roles; the
/// system prompt travels separately on the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderMessage {
    /// Role of the message sender (user or assistant)
    pub role: String,
    /// Text content of the message
    pub content: String,
}

impl ProviderMessage {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use aerin::providers::ProviderMessage;
    ///
    /// let msg = ProviderMessage::user("Hello, assistant!");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    ///
    /// # Examples
    ///
    /// ```
    /// use aerin::providers::ProviderMessage;
    ///
    /// let msg = ProviderMessage::assistant("Hello, user!");
    /// assert_eq!(msg.role, "assistant");
    /// ```
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A tool attached to a chat request, as a provider-native JSON schema
pub type ToolDefinition = serde_json::Value;

/// Assembled request for one streaming chat turn
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier to run the turn against
    pub model: String,
    /// Conversation history, oldest first
    pub messages: Vec<ProviderMessage>,
    /// System prompt attached to the turn
    pub system: String,
    /// Tools the model may invoke during the turn
    pub tools: Vec<ToolDefinition>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Token budget for extended-thinking reasoning
    pub thinking_budget_tokens: u32,
}

/// Normalized event forwarded from the provider stream to clients
///
/// Tagged the same way message parts are so the browser can map frames
/// onto parts without translation. Emission order is preserved from the
/// provider: a `Citation` precedes the text span it supports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    /// Incremental assistant text
    TextDelta { text: String },
    /// Incremental reasoning-trace text
    ReasoningDelta { text: String },
    /// A citation supporting the upcoming text span
    Citation {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    /// One result from a web search the model ran
    SourceUrl {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    /// The model started using a server-side tool
    ToolUse { name: String },
    /// The turn completed normally
    Finish,
}

/// Stream of normalized events from one chat turn
pub type EventStream = BoxStream<'static, Result<StreamEvent>>;

/// Trait for streaming chat providers
///
/// # Examples
///
/// ```no_run
/// use aerin::providers::{ChatProvider, ChatRequest, EventStream, StreamEvent};
/// use aerin::error::Result;
/// use async_trait::async_trait;
/// use futures::StreamExt;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl ChatProvider for MyProvider {
///     async fn stream_chat(&self, _request: ChatRequest) -> Result<EventStream> {
///         Ok(futures::stream::iter(vec![Ok(StreamEvent::Finish)]).boxed())
///     }
/// }
/// ```
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Starts a streaming chat turn
    ///
    /// # Returns
    ///
    /// A stream of normalized events ending with `Finish`, or an error
    /// item when the provider reports a failure mid-stream.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be issued at all; errors
    /// after streaming begins surface as stream items.
    async fn stream_chat(&self, request: ChatRequest) -> Result<EventStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_user() {
        let msg = ProviderMessage::user("Hello");
        assert_eq!(msg.role, "user");
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_provider_message_assistant() {
        let msg = ProviderMessage::assistant("Hi there");
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.content, "Hi there");
    }

    #[test]
    fn test_stream_event_serialization() {
        let event = StreamEvent::TextDelta {
            text: "chunk".to_string(),
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"type\":\"text-delta\""));

        let event = StreamEvent::SourceUrl {
            url: "https://example.org".to_string(),
            title: None,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"type\":\"source-url\""));
        assert!(!json.contains("title"));

        let finish = serde_json::to_string(&StreamEvent::Finish).expect("serialize");
        assert_eq!(finish, r#"{"type":"finish"}"#);
    }

    #[test]
    fn test_stream_event_deserialization() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"reasoning-delta","text":"hmm"}"#)
                .expect("deserialize");
        assert_eq!(
            event,
            StreamEvent::ReasoningDelta {
                text: "hmm".to_string()
            }
        );
    }
}
