//! Conversation state storage for Docpilot.
//!
//! The in-memory backend is the default: conversation state is ephemeral by
//! design and lives only for the life of the process. The
//! [`docpilot_core::ConversationStore`] trait keeps the door open for a
//! cache-backed implementation without touching callers.

pub mod in_memory;
pub mod locks;

pub use in_memory::InMemoryStore;
pub use locks::SessionLocks;
