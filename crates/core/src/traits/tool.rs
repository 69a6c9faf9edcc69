//! Tool interface for function calling
//!
//! Tools expose a JSON schema to the language model and execute against
//! JSON arguments. Outputs are content blocks so a tool can return plain
//! text or a serialized JSON payload.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::ToolDefinition;

/// Default timeout for a single tool execution
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// A callable tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name, as presented to the model
    fn name(&self) -> &str;

    /// Human readable description
    fn description(&self) -> &str;

    /// Full schema including parameters
    fn schema(&self) -> ToolSchema;

    /// Validate arguments before execution
    ///
    /// The default implementation checks that the input is an object and
    /// that every required property is present and non-null.
    fn validate(&self, input: &Value) -> Result<(), ToolError> {
        let schema = self.schema();
        let object = input
            .as_object()
            .ok_or_else(|| ToolError::invalid_params("arguments must be a JSON object"))?;

        for field in &schema.input_schema.required {
            match object.get(field) {
                Some(v) if !v.is_null() => {}
                _ => {
                    return Err(ToolError::invalid_params(format!(
                        "Missing required parameter: {}",
                        field
                    )))
                }
            }
        }
        Ok(())
    }

    /// Execute the tool
    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError>;

    /// Execution timeout in seconds
    fn timeout_secs(&self) -> u64 {
        DEFAULT_TOOL_TIMEOUT_SECS
    }
}

/// Tool schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
}

impl ToolSchema {
    /// Convert into the provider-neutral definition sent to the LLM
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            self.name.clone(),
            self.description.clone(),
            self.input_schema.to_json(),
        )
    }
}

/// JSON schema of a tool's input object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl InputSchema {
    /// Empty object schema
    pub fn object() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Add a property
    pub fn property(mut self, name: impl Into<String>, schema: PropertySchema, required: bool) -> Self {
        let name = name.into();
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    /// Render as a JSON schema value
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
    }
}

/// Schema of a single property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub prop_type: String,
    pub description: String,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl PropertySchema {
    fn typed(prop_type: &str, description: impl Into<String>) -> Self {
        Self {
            prop_type: prop_type.to_string(),
            description: description.into(),
            enum_values: None,
            default: None,
            minimum: None,
            maximum: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::typed("string", description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::typed("number", description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::typed("integer", description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::typed("boolean", description)
    }

    /// String restricted to a set of values
    pub fn enum_type(description: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            enum_values: Some(values),
            ..Self::typed("string", description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.minimum = Some(min);
        self.maximum = Some(max);
        self
    }
}

/// A block of tool output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolOutput {
    /// Plain text output
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// JSON payload serialized as a text block
    pub fn json(value: Value) -> Self {
        Self::text(value.to_string())
    }

    /// Error output
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(message)
        }
    }

    /// Concatenated text of all blocks
    pub fn to_text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                ContentBlock::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse the output as JSON, falling back to a JSON string
    pub fn to_json(&self) -> Value {
        let text = self.to_text();
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    }
}

/// Tool error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorCode {
    InvalidParams,
    NotFound,
    Timeout,
    ExecutionFailed,
    Internal,
}

impl fmt::Display for ToolErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolErrorCode::InvalidParams => "invalid_params",
            ToolErrorCode::NotFound => "not_found",
            ToolErrorCode::Timeout => "timeout",
            ToolErrorCode::ExecutionFailed => "execution_failed",
            ToolErrorCode::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Tool execution error
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ToolError {
    pub code: ToolErrorCode,
    pub message: String,
}

impl ToolError {
    pub fn new(code: ToolErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ToolErrorCode::InvalidParams, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorCode::NotFound, message)
    }

    pub fn timeout(tool: &str, secs: u64) -> Self {
        Self::new(
            ToolErrorCode::Timeout,
            format!("Tool '{}' timed out after {}s", tool, secs),
        )
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(ToolErrorCode::ExecutionFailed, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorCode::Internal, message)
    }
}
