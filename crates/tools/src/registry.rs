//! Tool Registry
//!
//! Manages tool registration, discovery, and execution.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use loan_advisor_core::{CustomerDirectory, SpecialistKind, Tool, ToolError, ToolOutput, ToolSchema};

use crate::loan::{
    CheckOverdueStatusTool, CreateEscalationTicketTool, CreatePaymentPlanTool,
    GeneratePaymentLinkTool, GetEmiDetailsTool, VerifyCustomerIdentityTool,
};

/// Tool executor trait
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool by name
    async fn execute(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError>;

    /// List available tools
    fn list_tools(&self) -> Vec<ToolSchema>;

    /// Get tool schema by name
    fn get_tool(&self, name: &str) -> Option<ToolSchema>;
}

/// Tool registry
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Sorted tool names
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    /// Validate, then execute under the tool's own timeout
    async fn execute(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::not_found(format!("Tool not found: {}", name)))?;

        let result = match tool.validate(&arguments) {
            Ok(()) => {
                let timeout_secs = tool.timeout_secs();
                tracing::trace!(tool = name, timeout_secs, "Executing tool with timeout");

                match tokio::time::timeout(Duration::from_secs(timeout_secs), tool.execute(arguments)).await {
                    Ok(result) => result,
                    Err(_elapsed) => Err(ToolError::timeout(name, timeout_secs)),
                }
            }
            Err(e) => Err(e),
        };

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(
            "loan_advisor_tool_invocations_total",
            "tool" => name.to_string(),
            "outcome" => outcome
        )
        .increment(1);

        result
    }

    fn list_tools(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    fn get_tool(&self, name: &str) -> Option<ToolSchema> {
        self.tools.get(name).map(|t| t.schema())
    }
}

/// Registry with all six loan tools
pub fn create_loan_registry(directory: Arc<dyn CustomerDirectory>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(VerifyCustomerIdentityTool::new(directory.clone()));
    registry.register(GetEmiDetailsTool::new(directory.clone()));
    registry.register(CheckOverdueStatusTool::new(directory.clone()));
    registry.register(GeneratePaymentLinkTool::new(directory.clone()));
    registry.register(CreatePaymentPlanTool::new(directory.clone()));
    registry.register(CreateEscalationTicketTool::new(directory));
    registry
}

/// Tool subset available to one specialist
pub fn specialist_registry(kind: SpecialistKind, directory: Arc<dyn CustomerDirectory>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    match kind {
        SpecialistKind::Verification => {
            registry.register(VerifyCustomerIdentityTool::new(directory));
        }
        SpecialistKind::EmiReminder => {
            registry.register(GetEmiDetailsTool::new(directory.clone()));
            registry.register(CheckOverdueStatusTool::new(directory));
        }
        SpecialistKind::PaymentCollection => {
            registry.register(GeneratePaymentLinkTool::new(directory));
        }
        SpecialistKind::PaymentPlan => {
            registry.register(CreatePaymentPlanTool::new(directory));
        }
        SpecialistKind::Escalation => {
            registry.register(CreateEscalationTicketTool::new(directory));
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use loan_advisor_core::{InMemoryCustomerDirectory, InputSchema, PropertySchema, ToolErrorCode};
    use serde_json::json;

    fn directory() -> Arc<dyn CustomerDirectory> {
        Arc::new(InMemoryCustomerDirectory::with_samples())
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Never finishes in time"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "slow".to_string(),
                description: "Never finishes in time".to_string(),
                input_schema: InputSchema::object().property("phone", PropertySchema::string("Phone"), false),
            }
        }

        async fn execute(&self, _input: Value) -> Result<ToolOutput, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolOutput::text("late"))
        }

        fn timeout_secs(&self) -> u64 {
            1
        }
    }

    #[test]
    fn test_loan_registry() {
        let registry = create_loan_registry(directory());
        assert_eq!(
            registry.tool_names(),
            vec![
                "check_overdue_status",
                "create_escalation_ticket",
                "create_payment_plan",
                "generate_payment_link",
                "get_emi_details",
                "verify_customer_identity",
            ]
        );
        assert_eq!(registry.list_tools().len(), 6);
        assert!(registry.get_tool("get_emi_details").is_some());
    }

    #[test]
    fn test_specialist_subsets() {
        let sizes: Vec<usize> = SpecialistKind::ALL
            .iter()
            .map(|kind| specialist_registry(*kind, directory()).len())
            .collect();
        assert_eq!(sizes, vec![1, 2, 1, 1, 1]);

        let emi = specialist_registry(SpecialistKind::EmiReminder, directory());
        assert!(emi.has("get_emi_details"));
        assert!(emi.has("check_overdue_status"));
        assert!(!emi.has("generate_payment_link"));
    }

    #[tokio::test]
    async fn test_execute_validates() {
        let registry = create_loan_registry(directory());

        let err = registry.execute("get_emi_details", json!({})).await.unwrap_err();
        assert_eq!(err.code, ToolErrorCode::InvalidParams);

        let err = registry.execute("no_such_tool", json!({})).await.unwrap_err();
        assert_eq!(err.code, ToolErrorCode::NotFound);

        let output = registry
            .execute("get_emi_details", json!({"phone": "+1234567891"}))
            .await
            .unwrap();
        assert_eq!(output.to_json()["success"], true);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_timeout() {
        let mut registry = ToolRegistry::new();
        registry.register(SlowTool);

        let err = registry.execute("slow", json!({})).await.unwrap_err();
        assert_eq!(err.code, ToolErrorCode::Timeout);
    }
}
