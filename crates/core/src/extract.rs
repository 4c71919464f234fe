//! Document extraction seam.
//!
//! Downloading a file and decoding PDF/DOCX/XLSX/PPTX into text happens in
//! the transport layer with format-specific libraries. Only the resulting
//! string crosses into the pipeline, wrapped in [`ExtractedDocument`] so the
//! empty-text case is rejected at the boundary.

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Document formats the extraction layer handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Xlsx,
    Pptx,
}

impl DocumentFormat {
    /// Map a file name to a supported format by extension.
    pub fn from_file_name(name: &str) -> std::result::Result<Self, ExtractError> {
        let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "xlsx" => Ok(Self::Xlsx),
            "pptx" => Ok(Self::Pptx),
            _ => Err(ExtractError::UnsupportedFormat(name.to_string())),
        }
    }
}

/// Extracted text from an uploaded document, validated non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Original file name.
    pub name: String,

    /// The full extracted text.
    pub text: String,
}

impl ExtractedDocument {
    /// Wrap extracted text, rejecting empty or whitespace-only output
    /// (the extractor ran but produced nothing usable).
    pub fn new(
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> std::result::Result<Self, ExtractError> {
        let name = name.into();
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ExtractError::EmptyText(name));
        }
        Ok(Self { name, text })
    }
}
