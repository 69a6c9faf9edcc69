//! LLM integration
//!
//! Features:
//! - OpenAI-compatible chat completions backend (OpenAI, Azure-style proxies, vLLM)
//! - Native function calling with tool results fed back as `tool` messages
//! - Exponential backoff on transient failures
//! - Prompt templates with `{placeholder}` substitution

pub mod backend;
pub mod prompt;

pub use backend::{OpenAIBackend, OpenAIConfig};
pub use prompt::PromptTemplate;

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

impl From<LlmError> for loan_advisor_core::Error {
    fn from(err: LlmError) -> Self {
        loan_advisor_core::Error::Llm(err.to_string())
    }
}
