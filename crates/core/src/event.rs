//! Inbound events and outbound replies.
//!
//! The chat transport parses raw webhook updates into [`InboundEvent`]s and
//! renders [`Reply`]s back to the user. One inbound event produces exactly
//! one reply.

use serde::{Deserialize, Serialize};

use crate::message::ConversationId;

/// A chat event delivered by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Which conversation this event belongs to.
    pub conversation_id: ConversationId,

    /// What arrived.
    pub payload: EventPayload,
}

impl InboundEvent {
    pub fn text(id: &str, text: impl Into<String>) -> Self {
        Self {
            conversation_id: ConversationId::from(id),
            payload: EventPayload::Text {
                text: text.into(),
                entities: Vec::new(),
            },
        }
    }

    pub fn command(id: &str, command: Command) -> Self {
        Self {
            conversation_id: ConversationId::from(id),
            payload: EventPayload::Command(command),
        }
    }

    pub fn document(id: &str, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            conversation_id: ConversationId::from(id),
            payload: EventPayload::Document {
                name: name.into(),
                extracted_text: text.into(),
            },
        }
    }
}

/// The payload of an inbound event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    /// A plain text message with transport-detected entities.
    Text { text: String, entities: Vec<Entity> },

    /// A document upload, already downloaded and decoded to text by the
    /// transport's extraction layer.
    Document { name: String, extracted_text: String },

    /// A bot command.
    Command(Command),
}

/// A transport-detected entity inside a text message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,

    /// Character offset of the entity within the message text.
    pub offset: usize,

    /// Length of the entity in characters.
    pub length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Url,
    Mention,
    Other,
}

/// Bot commands the pipeline reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Greeting and command list.
    Start,
    /// Command list.
    Help,
    /// Drop the conversation state.
    Reset,
    /// Drop the conversation state and delete prior bot messages.
    Clear,
    /// Enter table-analysis mode.
    Table,
    /// Leave table-analysis mode.
    ExitTable,
}

/// The single reply produced for an inbound event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    /// User-facing text. On failure this is a short diagnostic, never an
    /// error chain.
    pub text: String,

    /// Ask the transport to delete prior bot-authored messages
    /// (set by the clear command).
    #[serde(default)]
    pub purge_bot_messages: bool,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            purge_bot_messages: false,
        }
    }

    pub fn with_purge(mut self) -> Self {
        self.purge_bot_messages = true;
        self
    }
}
