//! # Docpilot Core
//!
//! Domain types, traits, and error definitions for the Docpilot assistant
//! pipeline. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (LLM endpoint, spreadsheet API, conversation
//! storage) is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod conversation;
pub mod error;
pub mod event;
pub mod extract;
pub mod message;
pub mod provider;
pub mod sheets;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use conversation::{Conversation, SessionMode};
pub use error::{Error, Result};
pub use event::{Command, Entity, EntityKind, EventPayload, InboundEvent, Reply};
pub use extract::{DocumentFormat, ExtractedDocument};
pub use message::{ConversationId, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use sheets::{SheetRange, SheetReader};
pub use store::ConversationStore;
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
