//! Model-invocable tool implementations for Docpilot.
//!
//! Currently one tool: reading rows from a connected spreadsheet during a
//! table-analysis session.

pub mod read_spreadsheet;

use std::sync::Arc;

use docpilot_core::sheets::SheetReader;
use docpilot_core::tool::ToolRegistry;

pub use read_spreadsheet::ReadSpreadsheetTool;

/// Create the registry declared during table-analysis sessions.
pub fn table_registry(reader: Arc<dyn SheetReader>, row_cap: usize) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ReadSpreadsheetTool::new(reader, row_cap)));
    registry
}
