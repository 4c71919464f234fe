//! The event handler — the boundary between the transport and the pipeline.
//!
//! One inbound event in, one reply out. Every error raised below this
//! boundary is converted to a short user-facing diagnostic; nothing
//! propagates out of a single event's processing. Events for the same
//! conversation id are serialized by a per-key lock; different ids run in
//! parallel.

use std::sync::Arc;
use tracing::{info, warn};

use docpilot_config::AppConfig;
use docpilot_core::conversation::{Conversation, SessionMode};
use docpilot_core::error::{Error, ExtractError, ProviderError};
use docpilot_core::event::{Command, Entity, EventPayload, InboundEvent, Reply};
use docpilot_core::extract::{DocumentFormat, ExtractedDocument};
use docpilot_core::message::{ConversationId, Message};
use docpilot_core::provider::{Provider, ProviderRequest};
use docpilot_core::store::ConversationStore;
use docpilot_core::tool::ToolRegistry;
use docpilot_store::SessionLocks;

use crate::context::{AssemblyOptions, FallbackPolicy, assemble, chunk};
use crate::orchestrator::Orchestrator;
use crate::session::{self, ConnectOutcome};

/// Persona for plain free chat.
const CHAT_SYSTEM_PROMPT: &str =
    "You are a thoughtful assistant. Remember the dialogue context and answer \
     clearly and to the point.";

/// Persona when a document is loaded.
const DOCUMENT_SYSTEM_PROMPT: &str =
    "You are an assistant answering questions about the contents of an \
     uploaded document. Ground every answer in the provided excerpts.";

const HELP_TEXT: &str = "Available commands:\n\
    /start — greeting\n\
    /help — this list\n\
    /reset — clear the conversation context\n\
    /clear — clear the context and delete my messages\n\
    /table — analyze a spreadsheet\n\
    /exit — leave table mode\n\n\
    Send a PDF, DOCX, XLSX or PPTX file to ask questions about it.";

/// Pipeline knobs the handler needs, extracted from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub chat_model: String,
    pub chat_temperature: f32,
    pub chat_max_tokens: u32,
    pub table_model: String,
    pub table_temperature: f32,
    pub table_max_tokens: u32,
    pub history_window: usize,
    pub chunk_size: usize,
    pub context_char_budget: usize,
    pub relevance_limit: usize,
    pub fallback_policy: FallbackPolicy,
    pub session_cap: usize,
}

impl HandlerSettings {
    /// Build settings from validated configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            chat_model: config.chat_model.clone(),
            chat_temperature: config.chat_temperature,
            chat_max_tokens: config.chat_max_tokens,
            table_model: config.table_model.clone(),
            table_temperature: config.table_temperature,
            table_max_tokens: config.table_max_tokens,
            history_window: config.max_history,
            chunk_size: config.chunk_size,
            context_char_budget: config.context_char_budget,
            relevance_limit: config.relevance_limit,
            fallback_policy: FallbackPolicy::parse(&config.relevance_fallback)
                .unwrap_or_default(),
            session_cap: config.session_cap,
        }
    }
}

/// Handles inbound events end to end.
pub struct Handler {
    store: Arc<dyn ConversationStore>,
    locks: SessionLocks,
    provider: Arc<dyn Provider>,
    table_tools: Arc<ToolRegistry>,
    table_orchestrator: Orchestrator,
    settings: HandlerSettings,
}

impl Handler {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        provider: Arc<dyn Provider>,
        table_tools: Arc<ToolRegistry>,
        settings: HandlerSettings,
    ) -> Self {
        let table_orchestrator = Orchestrator::new(
            provider.clone(),
            &settings.table_model,
            settings.table_temperature,
            settings.table_max_tokens,
        );
        Self {
            store,
            locks: SessionLocks::new(),
            provider,
            table_tools,
            table_orchestrator,
            settings,
        }
    }

    /// Process one inbound event and produce exactly one reply.
    pub async fn handle(&self, event: InboundEvent) -> Reply {
        let id = event.conversation_id.clone();

        // Per-conversation critical section: held across every await below
        let _guard = self.locks.acquire(&id).await;

        let result = match event.payload {
            EventPayload::Command(command) => self.handle_command(&id, command).await,
            EventPayload::Document {
                name,
                extracted_text,
            } => self.handle_document(&id, name, extracted_text).await,
            EventPayload::Text { text, entities } => {
                self.handle_text(&id, text, entities).await
            }
        };

        match result {
            Ok(reply) => reply,
            Err(error) => {
                warn!(conversation_id = %id, %error, "Event processing failed");
                Reply::text(user_facing(&error))
            }
        }
    }

    async fn handle_command(
        &self,
        id: &ConversationId,
        command: Command,
    ) -> Result<Reply, Error> {
        match command {
            Command::Start => Ok(Reply::text(format!("👋 Hi!\n\n{HELP_TEXT}"))),
            Command::Help => Ok(Reply::text(HELP_TEXT)),
            Command::Reset => {
                self.store.reset(id).await?;
                info!(conversation_id = %id, "Context reset");
                Ok(Reply::text("Context cleared."))
            }
            Command::Clear => {
                self.store.reset(id).await?;
                Ok(Reply::text("Context and chat history cleared.").with_purge())
            }
            Command::Table => {
                let mut conversation = self.store.get(id).await?;
                session::enter_table_mode(&mut conversation);
                self.store.put(conversation).await?;
                Ok(Reply::text("Send a link to the spreadsheet you want to analyze."))
            }
            Command::ExitTable => {
                let mut conversation = self.store.get(id).await?;
                session::exit_table_mode(&mut conversation);
                self.store.put(conversation).await?;
                Ok(Reply::text("Table mode is off."))
            }
        }
    }

    async fn handle_document(
        &self,
        id: &ConversationId,
        name: String,
        extracted_text: String,
    ) -> Result<Reply, Error> {
        DocumentFormat::from_file_name(&name)?;
        let document = ExtractedDocument::new(name, extracted_text)?;

        let chunks = chunk(&document.text, self.settings.chunk_size)
            .map_err(|e| Error::Internal(e.to_string()))?;
        info!(
            conversation_id = %id,
            document = %document.name,
            chunks = chunks.len(),
            "Document ingested"
        );

        self.store
            .set_document(id, chunks, document.name.clone())
            .await?;
        Ok(Reply::text(format!(
            "File \"{}\" processed. Ask your questions!",
            document.name
        )))
    }

    async fn handle_text(
        &self,
        id: &ConversationId,
        text: String,
        entities: Vec<Entity>,
    ) -> Result<Reply, Error> {
        // One store read per event; the mode branches reuse the snapshot
        let conversation = self.store.get(id).await?;
        match conversation.mode {
            SessionMode::Plain => self.chat_turn(id, conversation, &text).await,
            SessionMode::TableBegin => {
                let mut conversation = conversation;
                match session::connect_spreadsheet(
                    &mut conversation,
                    &text,
                    &entities,
                    self.settings.session_cap,
                ) {
                    ConnectOutcome::Connected { .. } => {
                        self.store.put(conversation).await?;
                        Ok(Reply::text(
                            "Spreadsheet connected. Ask a question about the data.",
                        ))
                    }
                    ConnectOutcome::NoLink => Ok(Reply::text(
                        "Please send a valid spreadsheet link (docs.google.com/spreadsheets/d/...).",
                    )),
                }
            }
            SessionMode::TableChat => self.table_turn(conversation, &text).await,
        }
    }

    /// Plain or document-grounded chat: a single direct model call.
    async fn chat_turn(
        &self,
        id: &ConversationId,
        conversation: Conversation,
        text: &str,
    ) -> Result<Reply, Error> {
        let system_prompt = if conversation.document_chunks.is_empty() {
            CHAT_SYSTEM_PROMPT
        } else {
            DOCUMENT_SYSTEM_PROMPT
        };
        let options = AssemblyOptions {
            system_prompt: system_prompt.into(),
            history_window: self.settings.history_window,
            context_char_budget: self.settings.context_char_budget,
            relevance_limit: self.settings.relevance_limit,
            fallback_policy: self.settings.fallback_policy,
        };
        let messages = assemble(&conversation, text, &options);

        let request = ProviderRequest::plain(&self.settings.chat_model, messages)
            .with_temperature(self.settings.chat_temperature)
            .with_max_tokens(self.settings.chat_max_tokens);
        let response = self.provider.complete(request).await?;

        let answer = response.message.content.clone();
        if answer.trim().is_empty() {
            // Do not pollute history with an empty exchange
            return Ok(Reply::text("The model returned an empty answer."));
        }

        // History is mutated only after a successful round trip
        self.store.append_history(id, Message::user(text)).await?;
        self.store.append_history(id, response.message).await?;

        Ok(Reply::text(answer))
    }

    /// Table-analysis chat: the two-phase tool loop over the session's own
    /// message list.
    async fn table_turn(
        &self,
        mut conversation: Conversation,
        text: &str,
    ) -> Result<Reply, Error> {
        conversation.push_table_message(Message::user(text), self.settings.session_cap);

        let run = self
            .table_orchestrator
            .run_with_tools(conversation.table_messages.clone(), &self.table_tools)
            .await?;

        let answer = run.final_message.content.clone();
        if answer.trim().is_empty() {
            return Ok(Reply::text("The model returned an empty answer."));
        }

        conversation.push_table_message(run.final_message, self.settings.session_cap);
        self.store.put(conversation).await?;

        Ok(Reply::text(format!("📊 {answer}")))
    }
}

/// Map an internal error to the short diagnostic shown to the user.
fn user_facing(error: &Error) -> String {
    match error {
        Error::Extract(ExtractError::UnsupportedFormat(_)) => {
            "This file format is not supported. Send PDF, DOCX, XLSX or PPTX.".into()
        }
        Error::Extract(ExtractError::EmptyText(_)) => {
            "Could not extract text from the file. Try another one.".into()
        }
        Error::Provider(ProviderError::RateLimited { .. }) => {
            "The model is overloaded right now. Try again in a minute.".into()
        }
        Error::Provider(_) => "Generation error. Try again later.".into(),
        Error::Tool(_) | Error::Sheet(_) => "Spreadsheet analysis error. Try again.".into(),
        _ => "Something went wrong. Try again.".into(),
    }
}
