//! Configuration management for the loan advisor
//!
//! Supports loading configuration from:
//! - YAML/TOML files under `config/`
//! - Environment variables (LOAN_ADVISOR_ prefix)
//! - Well-known provider variables (TWILIO_*, OPENAI_API_KEY, PUBLIC_BASE_URL)
//!
//! Prompts and the customer seed are data, loaded alongside the settings.

pub mod customers;
pub mod prompts;
pub mod settings;

pub use customers::CustomersConfig;
pub use prompts::PromptsConfig;
pub use settings::{
    load_settings, load_settings_from, AgentConfig, LlmConfig, ObservabilityConfig,
    RuntimeEnvironment, ServerConfig, Settings, TelephonyConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for loan_advisor_core::Error {
    fn from(err: ConfigError) -> Self {
        loan_advisor_core::Error::Config(err.to_string())
    }
}
