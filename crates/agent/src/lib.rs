//! The Docpilot pipeline — document-grounded context assembly and the
//! tool-augmented query loop.
//!
//! One inbound event flows through:
//!
//! 1. **Receive** a text/document event keyed by conversation id
//! 2. **Load state** from the conversation store (per-id critical section)
//! 3. **Ground** the prompt: chunked document text → relevance selection →
//!    bounded history window → current question
//! 4. **Complete**: a direct model call in plain/document mode, or the
//!    two-phase tool loop in table mode (call with tools → dispatch →
//!    inject results → call without tools)
//! 5. **Reply** exactly once; every failure becomes a short user-facing
//!    diagnostic, never a crash

pub mod context;
pub mod handler;
pub mod orchestrator;
pub mod session;

pub use context::{
    AssemblyOptions, ChunkError, FallbackPolicy, assemble, chunk, select_relevant,
};
pub use handler::{Handler, HandlerSettings};
pub use orchestrator::{Orchestrator, ToolLoopRun};
pub use session::{ConnectOutcome, SpreadsheetLink, extract_spreadsheet_id};
