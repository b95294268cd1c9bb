//! Text generation backends
//!
//! Features:
//! - OpenAI-compatible chat completions (OpenAI, Azure, local servers)
//! - Retry with exponential backoff for transient failures
//! - Construction from the `generation` settings section

pub mod backend;

pub use backend::{OpenAIBackend, OpenAIConfig};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for fleet_assistant_core::Error {
    fn from(err: LlmError) -> Self {
        fleet_assistant_core::Error::Llm(err.to_string())
    }
}
