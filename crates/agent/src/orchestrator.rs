//! The two-phase tool-orchestration loop.
//!
//! Protocol:
//!
//! 1. Call the provider with tool declarations (`tool_choice: auto`).
//! 2. If the assistant message carries tool calls, dispatch EACH one
//!    sequentially in the order the model returned them — injected
//!    tool-result ordering must stay deterministic and matched to
//!    `tool_call_id` — appending one tool-role message per call.
//!    An unknown tool name aborts the loop and propagates.
//! 3. Issue a second call with no tool declarations; its assistant message
//!    is final.
//! 4. No tool calls in the first response → it is already final.
//!
//! Provider errors are not retried here (the provider handles its own
//! timeout retry); they propagate as values for the handler to render.

use std::sync::Arc;
use tracing::{debug, info};

use docpilot_core::error::{Error, ToolError};
use docpilot_core::message::Message;
use docpilot_core::provider::{Provider, ProviderRequest};
use docpilot_core::tool::{ToolCall, ToolRegistry};

/// Drives the two-phase model interaction for one turn.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

/// The outcome of one orchestrated turn.
#[derive(Debug)]
pub struct ToolLoopRun {
    /// The final assistant message.
    pub final_message: Message,

    /// The full message list after the turn: the input messages plus the
    /// assistant tool-call message, one tool-role message per dispatched
    /// call, and the final assistant message.
    pub transcript: Vec<Message>,

    /// How many tool calls were dispatched.
    pub dispatched: usize,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    fn request(&self, messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest::plain(&self.model, messages)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// Run one turn over `messages` with the given tools declared.
    pub async fn run_with_tools(
        &self,
        mut messages: Vec<Message>,
        tools: &ToolRegistry,
    ) -> Result<ToolLoopRun, Error> {
        let first = self
            .provider
            .complete(self.request(messages.clone()).with_tools(tools.definitions()))
            .await?;

        if first.message.tool_calls.is_empty() {
            // Already final — no second call.
            debug!(model = %self.model, "No tool calls requested");
            messages.push(first.message.clone());
            return Ok(ToolLoopRun {
                final_message: first.message,
                transcript: messages,
                dispatched: 0,
            });
        }

        let tool_calls = first.message.tool_calls.clone();
        info!(count = tool_calls.len(), "Dispatching tool calls");
        messages.push(first.message);

        let mut dispatched = 0;
        for tc in &tool_calls {
            // Some models emit an empty arguments string for no-arg calls
            let raw = if tc.arguments.trim().is_empty() {
                "{}"
            } else {
                tc.arguments.as_str()
            };
            let arguments: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
                ToolError::InvalidArguments(format!(
                    "Tool {} arguments are not valid JSON: {e}",
                    tc.name
                ))
            })?;

            let call = ToolCall {
                id: tc.id.clone(),
                name: tc.name.clone(),
                arguments,
            };

            // Sequential on purpose; see module docs.
            let result = tools.dispatch(&call).await?;
            debug!(tool = %tc.name, call_id = %tc.id, "Tool call resolved");
            messages.push(Message::tool_result(&tc.id, &result.output));
            dispatched += 1;
        }

        let second = self.provider.complete(self.request(messages.clone())).await?;
        messages.push(second.message.clone());

        Ok(ToolLoopRun {
            final_message: second.message,
            transcript: messages,
            dispatched,
        })
    }
}
