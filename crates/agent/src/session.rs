//! The table-analysis session state machine.
//!
//! ```text
//!           /table                    link captured
//!  Plain ─────────► TableBegin ──────────────────► TableChat
//!    ▲                  │  no link: stay, ask again     │
//!    └──────────────────┴────────── /exit ◄─────────────┘
//! ```
//!
//! In `TableChat` every user message goes to the session's own message list
//! (separate from generic history) and through the tool loop with the
//! spreadsheet-read tool declared.

use tracing::info;

use docpilot_core::conversation::{Conversation, SessionMode};
use docpilot_core::event::{Entity, EntityKind};
use docpilot_core::message::Message;

/// Instructions seeding a connected table session.
pub const TABLE_ANALYST_PROMPT: &str = "\
You are a data analyst working with a single connected spreadsheet.

If answering requires data from the spreadsheet, use the read_spreadsheet \
tool. If no data is needed, answer without tools.

Use ONLY data from this spreadsheet. Do not invent values and do not ask \
for other spreadsheets.

Take previous messages into account. If the information is insufficient, \
ask a clarifying question.";

/// Prefix of the pinned system message recording the connected sheet.
pub const SPREADSHEET_URL_PREFIX: &str = "Spreadsheet URL:";

/// A spreadsheet link captured from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetLink {
    pub id: String,
    pub url: String,
}

/// Result of feeding a message to a `TableBegin` session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Transitioned to `TableChat`.
    Connected { spreadsheet_id: String },
    /// No extractable link; still waiting.
    NoLink,
}

/// Pull a spreadsheet id out of a message's URL entities.
///
/// The id is the `/d/<id>` path segment of the sheet URL, as in
/// `https://docs.google.com/spreadsheets/d/ABC123/edit`.
pub fn extract_spreadsheet_id(text: &str, entities: &[Entity]) -> Option<SpreadsheetLink> {
    let chars: Vec<char> = text.chars().collect();
    for entity in entities {
        if entity.kind != EntityKind::Url {
            continue;
        }
        let end = (entity.offset + entity.length).min(chars.len());
        if entity.offset >= end {
            continue;
        }
        let url: String = chars[entity.offset..end].iter().collect();
        if let Some(id) = sheet_id_from_url(&url) {
            return Some(SpreadsheetLink { id, url });
        }
    }
    None
}

fn sheet_id_from_url(url: &str) -> Option<String> {
    let start = url.find("/d/")? + 3;
    let id: String = url[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if id.is_empty() { None } else { Some(id) }
}

/// Enter table mode from any state, discarding any previous table session.
pub fn enter_table_mode(conversation: &mut Conversation) {
    conversation.mode = SessionMode::TableBegin;
    conversation.spreadsheet_id = None;
    conversation.spreadsheet_url = None;
    conversation.table_messages.clear();
}

/// Leave any table state back to plain chat.
pub fn exit_table_mode(conversation: &mut Conversation) {
    conversation.mode = SessionMode::Plain;
}

/// Try to capture a spreadsheet link while in `TableBegin`. On success the
/// session transitions to `TableChat` and is seeded with the analyst
/// instructions plus the pinned spreadsheet URL message.
pub fn connect_spreadsheet(
    conversation: &mut Conversation,
    text: &str,
    entities: &[Entity],
    session_cap: usize,
) -> ConnectOutcome {
    debug_assert_eq!(conversation.mode, SessionMode::TableBegin);

    let Some(link) = extract_spreadsheet_id(text, entities) else {
        return ConnectOutcome::NoLink;
    };

    info!(conversation_id = %conversation.id, spreadsheet_id = %link.id, "Spreadsheet connected");

    conversation.mode = SessionMode::TableChat;
    conversation.spreadsheet_id = Some(link.id.clone());
    conversation.spreadsheet_url = Some(link.url.clone());
    conversation.push_table_message(Message::system(TABLE_ANALYST_PROMPT), session_cap);
    conversation.push_table_message(
        Message::system(format!("{SPREADSHEET_URL_PREFIX} {}", link.url)),
        session_cap,
    );

    ConnectOutcome::Connected {
        spreadsheet_id: link.id,
    }
}
