//! Conversation repository
//!
//! Builds per-user conversation records and a per-user index (title,
//! timestamps, message count) on top of the object store. Record and
//! index writes are two separate steps with no transaction across them;
//! a crash between them can leave the two out of sync. Concurrent saves
//! to the same conversation race with last-write-wins semantics.

use crate::error::{AerinError, Result};
use crate::storage::ObjectStore;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub mod types;
pub use types::{
    ContextMessage, ConversationMetadata, MessagePart, StoredConversation, UiMessage,
    UserConversationIndex,
};

/// Maximum title length before truncation
const TITLE_MAX_CHARS: usize = 50;

/// Title used when a conversation has no user message yet
const DEFAULT_TITLE: &str = "New conversation";

/// Repository for per-user conversation records and indices
#[derive(Clone)]
pub struct ConversationStore {
    storage: Arc<dyn ObjectStore>,
}

fn conversation_path(user_id: &str, conversation_id: &str) -> String {
    format!(
        "conversations/users/{}/conversations/{}.json",
        user_id, conversation_id
    )
}

fn index_path(user_id: &str) -> String {
    format!("conversations/users/{}/index.json", user_id)
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Derive title and preview text from the first user message
///
/// The title is the first 50 characters of the first user text part,
/// with an ellipsis when truncated; the preview keeps the full text.
fn generate_title(messages: &[UiMessage]) -> (String, String) {
    let full_text = messages
        .iter()
        .find(|m| m.role == "user")
        .and_then(|m| {
            m.parts.iter().find_map(|p| match p {
                MessagePart::Text { text } => Some(text.clone()),
                _ => None,
            })
        })
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let title = if full_text.chars().count() > TITLE_MAX_CHARS {
        let truncated: String = full_text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", truncated)
    } else {
        full_text.clone()
    };

    (title, full_text)
}

impl ConversationStore {
    /// Create a repository over the given object store
    pub fn new(storage: Arc<dyn ObjectStore>) -> Self {
        Self { storage }
    }

    /// Save a conversation, minting an id when none is supplied
    ///
    /// When updating an existing conversation the original creation
    /// timestamp is preserved; everything else in the record is replaced.
    /// The caller is responsible for rate limiting and message-count
    /// validation before calling.
    ///
    /// # Returns
    ///
    /// The conversation id (newly minted or the one supplied).
    pub async fn save_conversation(
        &self,
        user_id: &str,
        conversation_id: Option<&str>,
        messages: Vec<UiMessage>,
        context_messages: Option<Vec<ContextMessage>>,
    ) -> Result<String> {
        let is_new = conversation_id.is_none();
        let id = conversation_id
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Preserve the original creation timestamp across updates.
        let mut created_at = now_millis();
        if !is_new {
            if let Some(existing) = self
                .storage
                .load(&conversation_path(user_id, &id))
                .await?
                .and_then(|v| serde_json::from_value::<StoredConversation>(v).ok())
            {
                created_at = existing.metadata.created_at;
            }
        }

        let (title, preview_text) = generate_title(&messages);

        let metadata = ConversationMetadata {
            id: id.clone(),
            user_id: user_id.to_string(),
            title,
            created_at,
            updated_at: now_millis(),
            message_count: messages.len(),
            preview_text,
        };

        let conversation = StoredConversation {
            metadata: metadata.clone(),
            messages,
            context_messages,
        };

        self.storage
            .save(
                &conversation_path(user_id, &id),
                &serde_json::to_value(&conversation)?,
            )
            .await?;

        self.update_user_index(user_id, metadata, is_new).await?;

        Ok(id)
    }

    /// Load a conversation, treating ownership mismatch as absence
    pub async fn load_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Option<StoredConversation>> {
        let value = self
            .storage
            .load(&conversation_path(user_id, conversation_id))
            .await?;

        let Some(value) = value else {
            return Ok(None);
        };

        let conversation: StoredConversation = serde_json::from_value(value)
            .map_err(|e| AerinError::Storage(format!("Corrupt conversation record: {}", e)))?;

        if conversation.metadata.user_id != user_id {
            tracing::warn!(
                conversation_id,
                "Conversation ownership mismatch, treating as not found"
            );
            return Ok(None);
        }

        Ok(Some(conversation))
    }

    /// Delete a conversation after re-validating ownership
    ///
    /// Record deletion and index removal are two non-atomic steps.
    ///
    /// # Errors
    ///
    /// `ConversationNotFound` when the record is absent or owned by a
    /// different user.
    pub async fn delete_conversation(&self, user_id: &str, conversation_id: &str) -> Result<()> {
        if self
            .load_conversation(user_id, conversation_id)
            .await?
            .is_none()
        {
            return Err(AerinError::ConversationNotFound.into());
        }

        self.storage
            .delete(&conversation_path(user_id, conversation_id))
            .await?;

        self.remove_from_index(user_id, conversation_id).await?;
        Ok(())
    }

    /// Delete every conversation listed in the user's index
    ///
    /// Individual record deletions that fail are logged and skipped so
    /// the clear completes; the index is then overwritten with an empty
    /// one. Returns the pre-clear count regardless of skipped failures.
    pub async fn clear_all_conversations(&self, user_id: &str) -> Result<usize> {
        let Some(index) = self.load_user_index(user_id).await? else {
            return Ok(0);
        };

        let count = index.conversations.len();

        for conversation in &index.conversations {
            if let Err(e) = self
                .storage
                .delete(&conversation_path(user_id, &conversation.id))
                .await
            {
                tracing::error!(
                    conversation_id = conversation.id,
                    "Failed to delete conversation during clear-all: {}",
                    e
                );
            }
        }

        let empty = UserConversationIndex {
            user_id: user_id.to_string(),
            conversations: Vec::new(),
            last_modified: now_millis(),
        };
        self.storage
            .save(&index_path(user_id), &serde_json::to_value(&empty)?)
            .await?;

        Ok(count)
    }

    /// Load the user's conversation index, or `None` if they have none
    pub async fn load_user_index(&self, user_id: &str) -> Result<Option<UserConversationIndex>> {
        let value = self.storage.load(&index_path(user_id)).await?;
        let Some(value) = value else {
            return Ok(None);
        };
        let index = serde_json::from_value(value)
            .map_err(|e| AerinError::Storage(format!("Corrupt index record: {}", e)))?;
        Ok(Some(index))
    }

    /// Insert or refresh a conversation's entry in the user's index
    ///
    /// New conversations go to the front; updated conversations move to
    /// the front with refreshed metadata. An entry missing for an update
    /// (index drift) is re-inserted.
    async fn update_user_index(
        &self,
        user_id: &str,
        metadata: ConversationMetadata,
        is_new: bool,
    ) -> Result<()> {
        let mut index = self
            .load_user_index(user_id)
            .await?
            .unwrap_or_else(|| UserConversationIndex {
                user_id: user_id.to_string(),
                conversations: Vec::new(),
                last_modified: now_millis(),
            });

        if is_new {
            index.conversations.insert(0, metadata);
        } else {
            index.conversations.retain(|c| c.id != metadata.id);
            index.conversations.insert(0, metadata);
        }

        index.last_modified = now_millis();

        self.storage
            .save(&index_path(user_id), &serde_json::to_value(&index)?)
            .await?;
        Ok(())
    }

    /// Remove a conversation's entry from the user's index
    async fn remove_from_index(&self, user_id: &str, conversation_id: &str) -> Result<()> {
        let Some(mut index) = self.load_user_index(user_id).await? else {
            return Ok(());
        };

        index.conversations.retain(|c| c.id != conversation_id);
        index.last_modified = now_millis();

        self.storage
            .save(&index_path(user_id), &serde_json::to_value(&index)?)
            .await?;
        Ok(())
    }
}
