//! ConversationStore trait — the abstraction over conversation state.
//!
//! The store is the only mutable shared state in the pipeline. It is created
//! at process start and injected into the handler, so it can be backed by an
//! in-memory map in tests and by a networked cache in production without
//! changing callers.
//!
//! Callers must serialize read-modify-write sequences on the SAME
//! conversation id (see the handler's per-key lock); the store itself only
//! guarantees that each individual operation is atomic.

use async_trait::async_trait;

use crate::conversation::Conversation;
use crate::error::StoreError;
use crate::message::{ConversationId, Message};

/// The core ConversationStore trait.
///
/// Implementations: in-memory (default and tests); a cache-backed store can
/// slot in behind the same interface.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Fetch a snapshot of the conversation, creating default zero-value
    /// state if the id has never been seen.
    async fn get(&self, id: &ConversationId) -> Result<Conversation, StoreError>;

    /// Write back a full conversation snapshot.
    async fn put(&self, conversation: Conversation) -> Result<(), StoreError>;

    /// Remove the entry entirely. Returns whether an entry existed.
    /// After a reset, `get` returns state indistinguishable from a
    /// never-seen conversation id.
    async fn reset(&self, id: &ConversationId) -> Result<bool, StoreError>;

    /// Append a message to the conversation's history, evicting the oldest
    /// entries past the store's configured maximum (FIFO).
    async fn append_history(
        &self,
        id: &ConversationId,
        message: Message,
    ) -> Result<(), StoreError>;

    /// Replace the conversation's document wholesale.
    async fn set_document(
        &self,
        id: &ConversationId,
        chunks: Vec<String>,
        name: String,
    ) -> Result<(), StoreError>;

    /// Number of conversations currently held.
    async fn count(&self) -> Result<usize, StoreError>;
}
