//! Core traits and types for the loan advisor voice agent
//!
//! This crate provides foundational types used across all other crates:
//! - Core traits for pluggable backends (LLM, tools, customer directory)
//! - LLM request/response types for function calling
//! - Customer records and loan arithmetic
//! - Conversation state and history
//! - Specialist roles
//! - Error types

pub mod conversation;
pub mod customer;
pub mod error;
pub mod llm_types;
pub mod specialist;
pub mod traits;

pub use conversation::{
    ConversationMessage, ConversationSnapshot, ConversationState, ConversationStep, Speaker,
    VerificationStatus,
};
pub use customer::{
    sample_customers, Customer, CustomerDirectory, EmiDetails, InMemoryCustomerDirectory,
    OverdueStatus,
};
pub use error::{Error, Result};
pub use specialist::SpecialistKind;
pub use llm_types::{
    FinishReason, GenerateRequest, GenerateResponse, Message, Role, TokenUsage, ToolCall,
    ToolDefinition,
};

pub use traits::{
    ContentBlock, InputSchema, LanguageModel, PropertySchema, Tool, ToolError, ToolErrorCode,
    ToolOutput, ToolSchema,
};
