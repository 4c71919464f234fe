//! Per-conversation mutable state.
//!
//! A [`Conversation`] holds everything the pipeline remembers about one chat:
//! the bounded message history, the currently loaded document (as ordered
//! chunks), and the table-analysis session state. It is never persisted
//! across restarts; an explicit reset removes the entry entirely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{ConversationId, Message, Role};

/// The conversation's current interaction state.
///
/// Transitions are one-directional per interaction: the table entry command
/// moves any state to `TableBegin`, a captured spreadsheet link moves
/// `TableBegin` to `TableChat`, and an explicit exit returns to `Plain`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Free chat, optionally grounded in an uploaded document.
    #[default]
    Plain,
    /// Table analysis requested, awaiting a spreadsheet link.
    TableBegin,
    /// Spreadsheet connected, questions answered via the sheet tool.
    TableChat,
}

/// All mutable state for a single conversation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// The transport-assigned conversation id.
    pub id: ConversationId,

    /// Bounded chat history (oldest evicted first).
    pub history: Vec<Message>,

    /// Ordered chunks of the currently loaded document. Replaced wholesale
    /// on each upload, never appended to.
    pub document_chunks: Vec<String>,

    /// Name of the currently loaded document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,

    /// Current session mode.
    pub mode: SessionMode,

    /// Connected spreadsheet id (set on `TableBegin` → `TableChat`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,

    /// Connected spreadsheet URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_url: Option<String>,

    /// The table session's own message list, separate from `history`.
    /// Seeded system messages are pinned; everything else is evicted
    /// oldest-first once the list exceeds its cap.
    pub table_messages: Vec<Message>,

    /// When this conversation was created.
    pub created_at: DateTime<Utc>,

    /// When it was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a fresh default-state conversation for the given id.
    pub fn new(id: ConversationId) -> Self {
        let now = Utc::now();
        Self {
            id,
            history: Vec::new(),
            document_chunks: Vec::new(),
            document_name: None,
            mode: SessionMode::default(),
            spreadsheet_id: None,
            spreadsheet_url: None,
            table_messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message to the history, evicting the oldest entries once
    /// the length exceeds `max_history` (FIFO).
    pub fn push_history(&mut self, message: Message, max_history: usize) {
        self.updated_at = Utc::now();
        self.history.push(message);
        if self.history.len() > max_history {
            let excess = self.history.len() - max_history;
            self.history.drain(..excess);
        }
    }

    /// The trailing window of at most `n` history entries.
    pub fn history_window(&self, n: usize) -> &[Message] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Replace the loaded document wholesale.
    pub fn set_document(&mut self, chunks: Vec<String>, name: impl Into<String>) {
        self.updated_at = Utc::now();
        self.document_chunks = chunks;
        self.document_name = Some(name.into());
    }

    /// Append to the table session's message list, evicting the oldest
    /// non-system entries once the length exceeds `cap`. Seeded system
    /// messages (analyst instructions, spreadsheet URL) survive eviction.
    pub fn push_table_message(&mut self, message: Message, cap: usize) {
        self.updated_at = Utc::now();
        self.table_messages.push(message);
        while self.table_messages.len() > cap {
            let Some(idx) = self
                .table_messages
                .iter()
                .position(|m| m.role != Role::System)
            else {
                break; // nothing evictable left
            };
            self.table_messages.remove(idx);
        }
    }
}
