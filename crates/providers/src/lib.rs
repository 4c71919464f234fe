//! LLM provider implementations for Docpilot.
//!
//! One implementation covers every backend the pipeline targets: Groq and
//! anything else exposing an OpenAI-style `/chat/completions` endpoint.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
