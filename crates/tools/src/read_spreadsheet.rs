//! Spreadsheet read tool.
//!
//! Wraps an injected [`SheetReader`] as a model-invocable tool. The result
//! payload is capped at a configured row count before serialization so a
//! large sheet cannot blow up the follow-up prompt.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use docpilot_core::error::ToolError;
use docpilot_core::sheets::SheetReader;
use docpilot_core::tool::{Tool, ToolResult};

pub struct ReadSpreadsheetTool {
    reader: Arc<dyn SheetReader>,
    row_cap: usize,
}

impl ReadSpreadsheetTool {
    pub fn new(reader: Arc<dyn SheetReader>, row_cap: usize) -> Self {
        Self { reader, row_cap }
    }
}

#[async_trait]
impl Tool for ReadSpreadsheetTool {
    fn name(&self) -> &str {
        "read_spreadsheet"
    }

    fn description(&self) -> &str {
        "Read all available data from the connected spreadsheet. \
         Returns the sheet name, row count, and cell values as a 2D array."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "spreadsheet_id": {
                    "type": "string",
                    "description": "Spreadsheet document ID"
                },
                "sheet_name": {
                    "type": "string",
                    "description": "Optional sheet (tab) name"
                }
            },
            "required": ["spreadsheet_id"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let spreadsheet_id = arguments["spreadsheet_id"]
            .as_str()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ToolError::InvalidArguments("Missing 'spreadsheet_id' argument".into())
            })?;

        let sheet_name = arguments["sheet_name"].as_str().filter(|s| !s.is_empty());

        let range = self
            .reader
            .read(spreadsheet_id, sheet_name)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "read_spreadsheet".into(),
                reason: e.to_string(),
            })?
            .truncated(self.row_cap);

        debug!(
            spreadsheet_id,
            rows = range.row_count,
            "Spreadsheet read for tool call"
        );

        let output = serde_json::to_string(&range).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "read_spreadsheet".into(),
            reason: format!("Failed to serialize sheet data: {e}"),
        })?;

        Ok(ToolResult {
            call_id: String::new(),
            output,
        })
    }
}
