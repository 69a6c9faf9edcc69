//! Error types shared across crates

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Telephony error: {0}")]
    Telephony(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<crate::traits::ToolError> for Error {
    fn from(err: crate::traits::ToolError) -> Self {
        Error::Tool(err.to_string())
    }
}

/// Result alias using the core error
pub type Result<T> = std::result::Result<T, Error>;
