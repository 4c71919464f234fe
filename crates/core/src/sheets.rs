//! SheetReader trait — the abstraction over the spreadsheet-read API.
//!
//! The actual Google Sheets client is an external collaborator. The pipeline
//! only needs "give me the rows of this spreadsheet", so that is the whole
//! trait. Tests use an in-memory fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SheetError;

/// Rows read from a spreadsheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetRange {
    /// The sheet (tab) the values came from.
    pub sheet_name: String,

    /// Number of rows in `values`.
    pub row_count: usize,

    /// Cell values, row-major. Cells are strings as rendered by the API.
    pub values: Vec<Vec<String>>,
}

impl SheetRange {
    pub fn new(sheet_name: impl Into<String>, values: Vec<Vec<String>>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            row_count: values.len(),
            values,
        }
    }

    /// Cap the range at `max_rows` rows, keeping the earliest ones.
    pub fn truncated(mut self, max_rows: usize) -> Self {
        if self.values.len() > max_rows {
            self.values.truncate(max_rows);
            self.row_count = self.values.len();
        }
        self
    }
}

/// The core SheetReader trait.
#[async_trait]
pub trait SheetReader: Send + Sync {
    /// Read rows from the given spreadsheet. `sheet_name` of `None` means
    /// the API default (usually the first sheet).
    async fn read(
        &self,
        spreadsheet_id: &str,
        sheet_name: Option<&str>,
    ) -> std::result::Result<SheetRange, SheetError>;
}
