//! Core traits for the loan advisor
//!
//! ```text
//! Language Models:
//!   - LanguageModel: Chat completion with function calling
//!
//! Tools:
//!   - Tool: Deterministic operations the model can invoke
//! ```

mod llm;
mod tool;

pub use llm::LanguageModel;
pub use tool::{
    ContentBlock, InputSchema, PropertySchema, Tool, ToolError, ToolErrorCode, ToolOutput,
    ToolSchema,
};
