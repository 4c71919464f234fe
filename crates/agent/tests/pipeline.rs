//! End-to-end pipeline tests: inbound events through the [`Handler`] against
//! a scripted provider and a fake spreadsheet reader.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use docpilot_agent::{Handler, HandlerSettings};
use docpilot_config::AppConfig;
use docpilot_core::conversation::Conversation;
use docpilot_core::error::{ProviderError, SheetError, StoreError};
use docpilot_core::event::{Command, Entity, EntityKind, EventPayload, InboundEvent};
use docpilot_core::message::{ConversationId, Message, MessageToolCall, Role};
use docpilot_core::provider::{Provider, ProviderRequest, ProviderResponse};
use docpilot_core::sheets::{SheetRange, SheetReader};
use docpilot_core::store::ConversationStore;
use docpilot_store::InMemoryStore;
use docpilot_tools::table_registry;

/// Replays scripted responses and records every request it receives.
struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn answer(text: &str) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: None,
            model: "scripted".into(),
        })
    }

    fn tool_call(id: &str, arguments: &str) -> Result<ProviderResponse, ProviderError> {
        let mut message = Message::assistant("");
        message.tool_calls.push(MessageToolCall {
            id: id.into(),
            name: "read_spreadsheet".into(),
            arguments: arguments.into(),
        });
        Ok(ProviderResponse {
            message,
            usage: None,
            model: "scripted".into(),
        })
    }

    fn recorded(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("script exhausted")
    }
}

/// Delegates to an in-memory store while counting `get` calls.
struct CountingStore {
    inner: InMemoryStore,
    gets: AtomicUsize,
}

impl CountingStore {
    fn new(max_history: usize) -> Self {
        Self {
            inner: InMemoryStore::new(max_history),
            gets: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ConversationStore for CountingStore {
    fn name(&self) -> &str {
        "counting"
    }

    async fn get(&self, id: &ConversationId) -> Result<Conversation, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id).await
    }

    async fn put(&self, conversation: Conversation) -> Result<(), StoreError> {
        self.inner.put(conversation).await
    }

    async fn reset(&self, id: &ConversationId) -> Result<bool, StoreError> {
        self.inner.reset(id).await
    }

    async fn append_history(
        &self,
        id: &ConversationId,
        message: Message,
    ) -> Result<(), StoreError> {
        self.inner.append_history(id, message).await
    }

    async fn set_document(
        &self,
        id: &ConversationId,
        chunks: Vec<String>,
        name: String,
    ) -> Result<(), StoreError> {
        self.inner.set_document(id, chunks, name).await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.inner.count().await
    }
}

struct FakeSheetReader;

#[async_trait]
impl SheetReader for FakeSheetReader {
    async fn read(
        &self,
        _spreadsheet_id: &str,
        sheet_name: Option<&str>,
    ) -> Result<SheetRange, SheetError> {
        Ok(SheetRange::new(
            sheet_name.unwrap_or("Sheet1"),
            vec![
                vec!["name".into(), "amount".into()],
                vec!["widget".into(), "42".into()],
            ],
        ))
    }
}

struct Fixture {
    handler: Handler,
    provider: Arc<ScriptedProvider>,
    store: Arc<InMemoryStore>,
}

fn fixture_with(config: AppConfig, responses: Vec<Result<ProviderResponse, ProviderError>>) -> Fixture {
    let provider = ScriptedProvider::new(responses);
    let store = Arc::new(InMemoryStore::new(config.max_history));
    let tools = Arc::new(table_registry(Arc::new(FakeSheetReader), config.sheet_row_cap));
    let handler = Handler::new(
        store.clone(),
        provider.clone(),
        tools,
        HandlerSettings::from_config(&config),
    );
    Fixture {
        handler,
        provider,
        store,
    }
}

fn fixture(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Fixture {
    fixture_with(AppConfig::default(), responses)
}

fn text_with_entities(id: &str, text: &str, entities: Vec<Entity>) -> InboundEvent {
    InboundEvent {
        conversation_id: ConversationId::from(id),
        payload: EventPayload::Text {
            text: text.into(),
            entities,
        },
    }
}

fn url_entity(offset: usize, length: usize) -> Entity {
    Entity {
        kind: EntityKind::Url,
        offset,
        length,
    }
}

const SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/ABC123/edit";

async fn connect_table(f: &Fixture, id: &str) {
    f.handler.handle(InboundEvent::command(id, Command::Table)).await;
    let reply = f
        .handler
        .handle(text_with_entities(
            id,
            SHEET_URL,
            vec![url_entity(0, SHEET_URL.chars().count())],
        ))
        .await;
    assert!(reply.text.contains("connected"), "got: {}", reply.text);
}

#[tokio::test]
async fn document_upload_then_overview_question_samples_structure() {
    // 3 full chunks and one 2000-char tail
    let text = format!(
        "{}{}{}{}",
        "a".repeat(6000),
        "b".repeat(6000),
        "c".repeat(6000),
        "d".repeat(2000)
    );
    let config = AppConfig {
        relevance_fallback: "structural_sample".into(),
        context_char_budget: 20_000,
        ..AppConfig::default()
    };
    let f = fixture_with(config, vec![ScriptedProvider::answer("it is about letters")]);

    let reply = f
        .handler
        .handle(InboundEvent::document("chat-1", "report.pdf", text))
        .await;
    assert!(reply.text.contains("report.pdf"));

    // No token of this question appears in any chunk, so the structural
    // sample kicks in: first, middle, and last chunk.
    let reply = f
        .handler
        .handle(InboundEvent::text("chat-1", "расскажи общий обзор файла"))
        .await;
    assert_eq!(reply.text, "it is about letters");

    let requests = f.provider.recorded();
    assert_eq!(requests.len(), 1);
    let context = &requests[0].messages[1];
    assert_eq!(context.role, Role::System);
    assert!(context.content.contains("report.pdf"));
    assert!(context.content.contains(&"a".repeat(6000)));
    assert!(context.content.contains(&"c".repeat(6000)));
    assert!(context.content.contains(&"d".repeat(2000)));
    assert!(!context.content.contains("bbb"));
}

#[tokio::test]
async fn unsupported_document_format_is_reported() {
    let f = fixture(vec![]);
    let reply = f
        .handler
        .handle(InboundEvent::document("chat-1", "notes.txt", "some text"))
        .await;
    assert!(reply.text.contains("not supported"));
    assert!(f.provider.recorded().is_empty());
}

#[tokio::test]
async fn table_mode_waits_for_a_valid_link() {
    let f = fixture(vec![]);

    let reply = f
        .handler
        .handle(InboundEvent::command("chat-1", Command::Table))
        .await;
    assert!(reply.text.contains("link"));

    // No URL entity: stays in TableBegin and asks again
    let reply = f.handler.handle(InboundEvent::text("chat-1", "вот таблица")).await;
    assert!(reply.text.contains("valid spreadsheet link"));

    let reply = f
        .handler
        .handle(text_with_entities(
            "chat-1",
            SHEET_URL,
            vec![url_entity(0, SHEET_URL.chars().count())],
        ))
        .await;
    assert!(reply.text.contains("connected"));

    let conversation = f.store.get(&ConversationId::from("chat-1")).await.unwrap();
    assert_eq!(conversation.spreadsheet_id.as_deref(), Some("ABC123"));
}

#[tokio::test]
async fn table_question_runs_the_tool_loop() {
    let f = fixture(vec![
        ScriptedProvider::tool_call("call_1", r#"{"spreadsheet_id":"ABC123"}"#),
        ScriptedProvider::answer("There are 2 rows"),
    ]);
    connect_table(&f, "chat-1").await;

    let reply = f
        .handler
        .handle(InboundEvent::text("chat-1", "сколько строк в таблице?"))
        .await;
    assert_eq!(reply.text, "📊 There are 2 rows");

    let requests = f.provider.recorded();
    assert_eq!(requests.len(), 2);
    // First phase declares the tool, second carries its result
    assert_eq!(requests[0].tools.len(), 1);
    assert!(requests[1].tools.is_empty());
    let tool_message = requests[1]
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("tool result injected");
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
    assert!(tool_message.content.contains("widget"));

    // The session keeps both the question and the final answer
    let conversation = f.store.get(&ConversationId::from("chat-1")).await.unwrap();
    let last = conversation.table_messages.last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.content, "There are 2 rows");
}

#[tokio::test]
async fn reset_clears_history_between_turns() {
    let f = fixture(vec![
        ScriptedProvider::answer("first answer"),
        ScriptedProvider::answer("second answer"),
    ]);

    f.handler.handle(InboundEvent::text("chat-1", "первый вопрос")).await;
    let reply = f
        .handler
        .handle(InboundEvent::command("chat-1", Command::Reset))
        .await;
    assert!(reply.text.contains("cleared"));

    f.handler.handle(InboundEvent::text("chat-1", "второй вопрос")).await;

    let requests = f.provider.recorded();
    // After reset the second request carries no history: system + user only
    assert_eq!(requests[1].messages.len(), 2);
    assert_eq!(requests[1].messages[1].content, "второй вопрос");
}

#[tokio::test]
async fn history_accumulates_across_successful_turns() {
    let f = fixture(vec![
        ScriptedProvider::answer("ответ один"),
        ScriptedProvider::answer("ответ два"),
    ]);

    f.handler.handle(InboundEvent::text("chat-1", "вопрос один")).await;
    f.handler.handle(InboundEvent::text("chat-1", "вопрос два")).await;

    let requests = f.provider.recorded();
    // system + [question 1, answer 1] + current question
    assert_eq!(requests[1].messages.len(), 4);
    assert_eq!(requests[1].messages[1].content, "вопрос один");
    assert_eq!(requests[1].messages[2].content, "ответ один");
    assert_eq!(requests[1].messages[3].content, "вопрос два");
}

#[tokio::test]
async fn provider_failure_becomes_short_diagnostic_and_leaves_no_history() {
    let f = fixture(vec![
        Err(ProviderError::ApiError {
            status_code: 500,
            message: "upstream exploded".into(),
        }),
        ScriptedProvider::answer("ok now"),
    ]);

    let reply = f.handler.handle(InboundEvent::text("chat-1", "вопрос")).await;
    assert_eq!(reply.text, "Generation error. Try again later.");
    assert!(!reply.text.contains("exploded"));

    // The failed exchange never reached history
    f.handler.handle(InboundEvent::text("chat-1", "ещё вопрос")).await;
    let requests = f.provider.recorded();
    assert_eq!(requests[1].messages.len(), 2);
}

#[tokio::test]
async fn empty_model_answer_leaves_history_untouched() {
    let f = fixture(vec![
        ScriptedProvider::answer("   "),
        ScriptedProvider::answer("real answer"),
    ]);

    let reply = f.handler.handle(InboundEvent::text("chat-1", "вопрос")).await;
    assert!(reply.text.contains("empty answer"));

    f.handler.handle(InboundEvent::text("chat-1", "ещё вопрос")).await;
    let requests = f.provider.recorded();
    assert_eq!(requests[1].messages.len(), 2);
}

#[tokio::test]
async fn clear_requests_bot_message_purge() {
    let f = fixture(vec![]);
    let reply = f
        .handler
        .handle(InboundEvent::command("chat-1", Command::Clear))
        .await;
    assert!(reply.purge_bot_messages);
}

#[tokio::test]
async fn exit_returns_the_session_to_plain_chat() {
    let f = fixture(vec![
        ScriptedProvider::tool_call("call_1", r#"{"spreadsheet_id":"ABC123"}"#),
        ScriptedProvider::answer("analysis"),
        ScriptedProvider::answer("plain answer"),
    ]);
    connect_table(&f, "chat-1").await;

    f.handler
        .handle(InboundEvent::text("chat-1", "проанализируй"))
        .await;
    f.handler
        .handle(InboundEvent::command("chat-1", Command::ExitTable))
        .await;

    // Back in plain mode: a single direct call with no tools declared
    let reply = f.handler.handle(InboundEvent::text("chat-1", "просто вопрос")).await;
    assert_eq!(reply.text, "plain answer");
    let requests = f.provider.recorded();
    assert!(requests.last().unwrap().tools.is_empty());
}

#[tokio::test]
async fn text_event_reads_the_store_once() {
    let provider = ScriptedProvider::new(vec![ScriptedProvider::answer("ответ")]);
    let store = Arc::new(CountingStore::new(20));
    let tools = Arc::new(table_registry(Arc::new(FakeSheetReader), 500));
    let handler = Handler::new(
        store.clone(),
        provider,
        tools,
        HandlerSettings::from_config(&AppConfig::default()),
    );

    handler.handle(InboundEvent::text("chat-1", "вопрос")).await;
    assert_eq!(store.gets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn conversations_are_isolated_by_id() {
    let f = fixture(vec![
        ScriptedProvider::answer("для первого"),
        ScriptedProvider::answer("для второго"),
    ]);

    f.handler.handle(InboundEvent::text("chat-1", "вопрос от первого")).await;
    f.handler.handle(InboundEvent::text("chat-2", "вопрос от второго")).await;

    let requests = f.provider.recorded();
    // Neither request sees the other conversation's history
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(requests[1].messages.len(), 2);
}
