//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{ConfigError, CustomersConfig, PromptsConfig};

/// Placeholder values shipped in sample environments
const PLACEHOLDER_ACCOUNT_SID: &str = "your_account_sid_here";
const PLACEHOLDER_AUTH_TOKEN: &str = "your_auth_token_here";
const PLACEHOLDER_BASE_URL: &str = "https://your-ngrok-url.ngrok.io";

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    /// Twilio account and call behaviour
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// Chat completions backend
    #[serde(default)]
    pub llm: LlmConfig,

    /// Orchestrator and specialist limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Customer seed
    #[serde(default)]
    pub customers: CustomersConfig,

    /// System prompts
    #[serde(default)]
    pub prompts: PromptsConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "must be non-zero"));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::invalid(
                "llm.temperature",
                format!("{} is outside [0, 2]", self.llm.temperature),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::invalid("agent.max_iterations", "must be at least 1"));
        }

        if self.agent.specialist_max_iterations == 0 {
            return Err(ConfigError::invalid(
                "agent.specialist_max_iterations",
                "must be at least 1",
            ));
        }

        if self.agent.history_window == 0 {
            return Err(ConfigError::invalid("agent.history_window", "must be at least 1"));
        }

        if self.telephony.max_turns == 0 {
            return Err(ConfigError::invalid("telephony.max_turns", "must be at least 1"));
        }

        Ok(())
    }

    /// Check that outbound calling and webhooks can work
    ///
    /// Fails on empty or placeholder Twilio credentials and on a missing
    /// public base URL.
    pub fn check_telephony_ready(&self) -> Result<(), ConfigError> {
        let t = &self.telephony;

        if t.account_sid.is_empty() || t.account_sid == PLACEHOLDER_ACCOUNT_SID {
            return Err(ConfigError::MissingField("telephony.account_sid".to_string()));
        }
        if t.auth_token.is_empty() || t.auth_token == PLACEHOLDER_AUTH_TOKEN {
            return Err(ConfigError::MissingField("telephony.auth_token".to_string()));
        }
        if t.public_base_url.is_empty() || t.public_base_url == PLACEHOLDER_BASE_URL {
            return Err(ConfigError::MissingField(
                "telephony.public_base_url".to_string(),
            ));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins (empty means any)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Twilio configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    #[serde(default = "default_account_sid")]
    pub account_sid: String,

    #[serde(default = "default_auth_token")]
    pub auth_token: String,

    /// Caller ID for outbound calls
    #[serde(default = "default_phone_number")]
    pub phone_number: String,

    /// Publicly reachable base URL for webhooks
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Twilio REST API base
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default = "default_language")]
    pub language: String,

    /// Seconds to wait for speech to start
    #[serde(default = "default_gather_timeout")]
    pub gather_timeout_secs: u32,

    /// Turns before the call is closed
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Reject webhooks without a valid X-Twilio-Signature
    #[serde(default)]
    pub validate_signatures: bool,

    /// Calls idle longer than this are expired
    #[serde(default = "default_call_idle_timeout")]
    pub call_idle_timeout_secs: u64,

    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_account_sid() -> String {
    std::env::var("TWILIO_ACCOUNT_SID").unwrap_or_else(|_| PLACEHOLDER_ACCOUNT_SID.to_string())
}
fn default_auth_token() -> String {
    std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_else(|_| PLACEHOLDER_AUTH_TOKEN.to_string())
}
fn default_phone_number() -> String {
    std::env::var("TWILIO_PHONE_NUMBER").unwrap_or_else(|_| "+1234567890".to_string())
}
fn default_public_base_url() -> String {
    std::env::var("PUBLIC_BASE_URL")
        .or_else(|_| std::env::var("NGROK_URL"))
        .unwrap_or_else(|_| PLACEHOLDER_BASE_URL.to_string())
}
fn default_api_base() -> String {
    "https://api.twilio.com".to_string()
}
fn default_voice() -> String {
    "alice".to_string()
}
fn default_language() -> String {
    "en-US".to_string()
}
fn default_gather_timeout() -> u32 {
    10
}
fn default_max_turns() -> u32 {
    20
}
fn default_call_idle_timeout() -> u64 {
    3600
}
fn default_cleanup_interval() -> u64 {
    60
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            account_sid: default_account_sid(),
            auth_token: default_auth_token(),
            phone_number: default_phone_number(),
            public_base_url: default_public_base_url(),
            api_base: default_api_base(),
            voice: default_voice(),
            language: default_language(),
            gather_timeout_secs: default_gather_timeout(),
            max_turns: default_max_turns(),
            validate_signatures: false,
            call_idle_timeout_secs: default_call_idle_timeout(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

/// LLM backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API base
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_api_key")]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default)]
    pub organization: Option<String>,
}

fn default_llm_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key() -> String {
    std::env::var("OPENAI_API_KEY").unwrap_or_default()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_llm_timeout() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    500
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: default_api_key(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_llm_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            organization: None,
        }
    }
}

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Company named in the greeting
    #[serde(default = "default_company_name")]
    pub company_name: String,

    /// Orchestrator tool-calling iterations per turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Specialist tool-calling iterations per delegation
    #[serde(default = "default_specialist_max_iterations")]
    pub specialist_max_iterations: u32,

    /// Messages of history given to the orchestrator
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_company_name() -> String {
    "ABC Financial Services".to_string()
}
fn default_max_iterations() -> u32 {
    10
}
fn default_specialist_max_iterations() -> u32 {
    15
}
fn default_history_window() -> usize {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            company_name: default_company_name(),
            max_iterations: default_max_iterations(),
            specialist_max_iterations: default_specialist_max_iterations(),
            history_window: default_history_window(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Install the Prometheus recorder and expose /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (LOAN_ADVISOR_ prefix, `__` separator)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Same as [`load_settings`] with an explicit config directory
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(
        File::with_name(&dir.join("default").to_string_lossy()).required(false),
    );

    if let Some(env_name) = env {
        builder = builder
            .add_source(File::with_name(&dir.join(env_name).to_string_lossy()).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("LOAN_ADVISOR")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        environment = ?settings.environment,
        port = settings.server.port,
        model = %settings.llm.model,
        "Settings loaded"
    );

    Ok(settings)
}
