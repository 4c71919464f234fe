//! Prompt assembly.
//!
//! Builds the ordered message sequence for one model call:
//!
//! 1. The system persona message
//! 2. Optionally, a document-context message (relevance-selected excerpt,
//!    bounded to a character budget with an explicit truncation marker)
//! 3. The trailing window of conversation history
//! 4. The current user message, exactly once
//!
//! Pure transform: the current question is never inside the history window
//! at assembly time, because history is only appended after a successful
//! round trip (the caller's job).

use docpilot_core::conversation::Conversation;
use docpilot_core::message::Message;

use crate::context::relevance::{FallbackPolicy, select_relevant};

/// Appended to a document excerpt cut off at the character budget.
pub const TRUNCATION_MARKER: &str = "[truncated]";

/// Knobs for one assembly pass. All values come from configuration.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// The assistant's persona instructions.
    pub system_prompt: String,

    /// How many trailing history entries to include.
    pub history_window: usize,

    /// Character budget for the document-context excerpt.
    pub context_char_budget: usize,

    /// Maximum chunks the relevance selector may contribute.
    pub relevance_limit: usize,

    /// Fallback when no chunk matches the question.
    pub fallback_policy: FallbackPolicy,
}

/// Assemble the message sequence for `user_message` against the current
/// conversation state.
pub fn assemble(
    conversation: &Conversation,
    user_message: &str,
    options: &AssemblyOptions,
) -> Vec<Message> {
    let mut messages = Vec::new();

    messages.push(Message::system(&options.system_prompt));

    if let Some(context) = document_context(conversation, user_message, options) {
        messages.push(Message::system(context));
    }

    messages.extend_from_slice(conversation.history_window(options.history_window));

    messages.push(Message::user(user_message));

    messages
}

/// Render the document-context excerpt, if a document is loaded and the
/// selector returns anything.
fn document_context(
    conversation: &Conversation,
    user_message: &str,
    options: &AssemblyOptions,
) -> Option<String> {
    if conversation.document_chunks.is_empty() {
        return None;
    }

    let selected = select_relevant(
        &conversation.document_chunks,
        user_message,
        options.relevance_limit,
        options.fallback_policy,
    );
    if selected.is_empty() {
        return None;
    }

    let excerpt = bounded(&selected.join("\n\n"), options.context_char_budget);
    let name = conversation.document_name.as_deref().unwrap_or("document");
    Some(format!("Relevant excerpts from \"{name}\":\n{excerpt}"))
}

/// Truncate `text` to `budget` characters, marking the cut.
fn bounded(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(budget).collect();
    cut.push('\n');
    cut.push_str(TRUNCATION_MARKER);
    cut
}
