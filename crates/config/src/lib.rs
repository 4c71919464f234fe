//! Configuration loading, validation, and management for Docpilot.
//!
//! Loads configuration from a TOML file with environment variable overrides.
//! Validates all settings at startup: a missing API credential is fatal and
//! the process must not start (the only error class allowed to terminate
//! the process).

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Fallback policy names accepted by `relevance_fallback`.
pub const FALLBACK_POLICIES: &[&str] = &["first_n", "structural_sample", "empty"];

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required credential: {0}")]
    MissingCredential(String),
}

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion endpoint. Required; may come from the
    /// `DOCPILOT_API_KEY` environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible completion endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model for plain and document-grounded chat.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Model for table-analysis sessions.
    #[serde(default = "default_table_model")]
    pub table_model: String,

    /// Temperature for plain/document chat.
    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,

    /// Temperature for table analysis (deterministic by default).
    #[serde(default)]
    pub table_temperature: f32,

    /// Max tokens per plain/document completion.
    #[serde(default = "default_chat_max_tokens")]
    pub chat_max_tokens: u32,

    /// Max tokens per table-analysis completion.
    #[serde(default = "default_table_max_tokens")]
    pub table_max_tokens: u32,

    /// Maximum history entries retained per conversation (FIFO eviction).
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Document chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Character budget for the document-context excerpt in a prompt.
    #[serde(default = "default_context_char_budget")]
    pub context_char_budget: usize,

    /// Maximum chunks the relevance selector returns.
    #[serde(default = "default_relevance_limit")]
    pub relevance_limit: usize,

    /// Fallback policy when no chunk matches the query:
    /// "first_n" (default), "structural_sample", or "empty".
    #[serde(default = "default_relevance_fallback")]
    pub relevance_fallback: String,

    /// Row cap applied to spreadsheet reads.
    #[serde(default = "default_sheet_row_cap")]
    pub sheet_row_cap: usize,

    /// Cap on the table session's message list (pinned entries excluded
    /// from eviction).
    #[serde(default = "default_session_cap")]
    pub session_cap: usize,

    /// Timeout for each completion / spreadsheet request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_chat_model() -> String {
    "llama-3.3-70b-versatile".into()
}
fn default_table_model() -> String {
    "llama-3.1-8b-instant".into()
}
fn default_chat_temperature() -> f32 {
    0.3
}
fn default_chat_max_tokens() -> u32 {
    2048
}
fn default_table_max_tokens() -> u32 {
    1024
}
fn default_max_history() -> usize {
    20
}
fn default_chunk_size() -> usize {
    6000
}
fn default_context_char_budget() -> usize {
    8000
}
fn default_relevance_limit() -> usize {
    3
}
fn default_relevance_fallback() -> String {
    "first_n".into()
}
fn default_sheet_row_cap() -> usize {
    500
}
fn default_session_cap() -> usize {
    12
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        // serde fills every field from its default function
        toml::from_str("").expect("empty config must deserialize")
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("chat_model", &self.chat_model)
            .field("table_model", &self.table_model)
            .field("chat_temperature", &self.chat_temperature)
            .field("table_temperature", &self.table_temperature)
            .field("chat_max_tokens", &self.chat_max_tokens)
            .field("table_max_tokens", &self.table_max_tokens)
            .field("max_history", &self.max_history)
            .field("chunk_size", &self.chunk_size)
            .field("context_char_budget", &self.context_char_budget)
            .field("relevance_limit", &self.relevance_limit)
            .field("relevance_fallback", &self.relevance_fallback)
            .field("sheet_row_cap", &self.sheet_row_cap)
            .field("session_cap", &self.session_cap)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply environment
    /// overrides. A missing file yields pure defaults + environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            toml::from_str(&raw)?
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `DOCPILOT_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("DOCPILOT_API_KEY") {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("DOCPILOT_API_URL") {
            if !url.is_empty() {
                self.api_url = url;
            }
        }
        if let Ok(model) = std::env::var("DOCPILOT_CHAT_MODEL") {
            if !model.is_empty() {
                self.chat_model = model;
            }
        }
        if let Ok(model) = std::env::var("DOCPILOT_TABLE_MODEL") {
            if !model.is_empty() {
                self.table_model = model;
            }
        }
        if let Ok(n) = std::env::var("DOCPILOT_MAX_HISTORY") {
            if let Ok(n) = n.parse() {
                self.max_history = n;
            }
        }
        if let Ok(n) = std::env::var("DOCPILOT_CHUNK_SIZE") {
            if let Ok(n) = n.parse() {
                self.chunk_size = n;
            }
        }
    }

    /// Validate the configuration at startup.
    ///
    /// Errors here are fatal: the process must not start with missing
    /// credentials or degenerate pipeline limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::MissingCredential(
                "api_key (or DOCPILOT_API_KEY)".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be positive".into()));
        }
        if self.max_history == 0 {
            return Err(ConfigError::Invalid("max_history must be positive".into()));
        }
        if self.session_cap == 0 {
            return Err(ConfigError::Invalid("session_cap must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if !FALLBACK_POLICIES.contains(&self.relevance_fallback.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "relevance_fallback must be one of {:?}, got {:?}",
                FALLBACK_POLICIES, self.relevance_fallback
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> AppConfig {
        AppConfig {
            api_key: Some("gsk_test".into()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn defaults_match_deployment_values() {
        let config = AppConfig::default();
        assert_eq!(config.max_history, 20);
        assert_eq!(config.chunk_size, 6000);
        assert_eq!(config.sheet_row_cap, 500);
        assert_eq!(config.session_cap, 12);
        assert_eq!(config.relevance_fallback, "first_n");
        assert_eq!(config.table_temperature, 0.0);
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential(_)));
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let config = AppConfig {
            chunk_size: 0,
            ..valid()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_fallback_policy_is_rejected() {
        let config = AppConfig {
            relevance_fallback: "last_n".into(),
            ..valid()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
api_key = "gsk_from_file"
chat_model = "llama-3.1-70b"
max_history = 50
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("gsk_from_file"));
        assert_eq!(config.chat_model, "llama-3.1-70b");
        assert_eq!(config.max_history, 50);
        // untouched fields keep defaults
        assert_eq!(config.chunk_size, 6000);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/docpilot.toml")).unwrap();
        assert_eq!(config.chat_model, default_chat_model());
    }

    #[test]
    fn debug_redacts_api_key() {
        let rendered = format!("{:?}", valid());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("gsk_test"));
    }
}
