//! In-memory conversation store.
//!
//! Holds one [`Conversation`] per id in a map behind an async `RwLock`.
//! Each operation is atomic; multi-step read-modify-write sequences are
//! serialized by the handler's per-key [`crate::SessionLocks`].

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use docpilot_core::conversation::Conversation;
use docpilot_core::error::StoreError;
use docpilot_core::message::{ConversationId, Message};
use docpilot_core::store::ConversationStore;

/// An in-memory store keyed by conversation id.
pub struct InMemoryStore {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
    max_history: usize,
}

impl InMemoryStore {
    /// Create a store whose history bound is `max_history` entries.
    pub fn new(max_history: usize) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            max_history,
        }
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, id: &ConversationId) -> Result<Conversation, StoreError> {
        let conversations = self.conversations.read().await;
        if let Some(conversation) = conversations.get(id) {
            return Ok(conversation.clone());
        }
        drop(conversations);

        debug!(conversation_id = %id, "Creating conversation state");
        let mut conversations = self.conversations.write().await;
        Ok(conversations
            .entry(id.clone())
            .or_insert_with(|| Conversation::new(id.clone()))
            .clone())
    }

    async fn put(&self, conversation: Conversation) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.id.clone(), conversation);
        Ok(())
    }

    async fn reset(&self, id: &ConversationId) -> Result<bool, StoreError> {
        let mut conversations = self.conversations.write().await;
        let existed = conversations.remove(id).is_some();
        if existed {
            debug!(conversation_id = %id, "Conversation state removed");
        }
        Ok(existed)
    }

    async fn append_history(
        &self,
        id: &ConversationId,
        message: Message,
    ) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(id.clone())
            .or_insert_with(|| Conversation::new(id.clone()))
            .push_history(message, self.max_history);
        Ok(())
    }

    async fn set_document(
        &self,
        id: &ConversationId,
        chunks: Vec<String>,
        name: String,
    ) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(id.clone())
            .or_insert_with(|| Conversation::new(id.clone()))
            .set_document(chunks, name);
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.conversations.read().await.len())
    }
}
