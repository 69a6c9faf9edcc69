//! Loan advisor agents
//!
//! Features:
//! - Tool-calling executor loop with an iteration cap
//! - Five specialist sub-agents, each with its own prompt and tool subset
//! - Orchestrator that delegates to specialists and can end the call
//! - `LoanAdvisor` conversation manager keyed by customer phone

pub mod advisor;
pub mod executor;
pub mod orchestrator;
pub mod specialist;

pub use advisor::{LoanAdvisor, RESTART_MESSAGE, TECHNICAL_DIFFICULTY_MESSAGE};
pub use executor::{AgentExecutor, ExecutorOutcome, ToolInvocation, ITERATION_LIMIT_MESSAGE};
pub use orchestrator::{apply_invocations, Orchestrator, TurnOutcome, END_CALL_TOOL};
pub use specialist::{Delegation, Specialist, SpecialistReport};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Conversation error: {0}")]
    Conversation(String),

    #[error("Timeout")]
    Timeout,
}

impl From<loan_advisor_core::Error> for AgentError {
    fn from(err: loan_advisor_core::Error) -> Self {
        match err {
            loan_advisor_core::Error::Llm(msg) => AgentError::Llm(msg),
            loan_advisor_core::Error::Tool(msg) => AgentError::Tool(msg),
            other => AgentError::Conversation(other.to_string()),
        }
    }
}

impl From<loan_advisor_llm::LlmError> for AgentError {
    fn from(err: loan_advisor_llm::LlmError) -> Self {
        AgentError::Llm(err.to_string())
    }
}

impl From<loan_advisor_tools::ToolError> for AgentError {
    fn from(err: loan_advisor_tools::ToolError) -> Self {
        AgentError::Tool(err.to_string())
    }
}

impl From<AgentError> for loan_advisor_core::Error {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Llm(msg) => loan_advisor_core::Error::Llm(msg),
            AgentError::Tool(msg) => loan_advisor_core::Error::Tool(msg),
            other => loan_advisor_core::Error::Internal(other.to_string()),
        }
    }
}
