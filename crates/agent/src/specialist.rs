//! Specialist sub-agents
//!
//! Each specialist is an executor run with its own system prompt and a
//! narrow tool subset. The orchestrator reaches a specialist through a
//! delegation tool; the tool's arguments are flattened into the
//! specialist's input line.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use loan_advisor_core::{CustomerDirectory, InputSchema, PropertySchema, SpecialistKind, ToolSchema};
use loan_advisor_llm::PromptTemplate;
use loan_advisor_tools::{specialist_registry, ToolRegistry};

use crate::executor::{AgentExecutor, ToolInvocation};

/// How the orchestrator hands work to a specialist
pub trait Delegation {
    /// Name of the orchestrator tool that engages this specialist
    fn tool_name(&self) -> &'static str;

    /// Reverse of [`Delegation::tool_name`]
    fn from_tool_name(name: &str) -> Option<SpecialistKind>;

    /// Schema of the delegation tool
    fn delegation_schema(&self) -> ToolSchema;

    /// Input line for the specialist, built from delegation arguments
    fn format_input(&self, arguments: &Value) -> String;

    /// Output used when the specialist returns nothing
    fn fallback_output(&self) -> String;
}

fn phone_param() -> PropertySchema {
    PropertySchema::string("Customer phone number in E.164 format")
}

fn task_param() -> PropertySchema {
    PropertySchema::string("What the specialist should do")
}

/// Argument as it reads in an input line; strings are unquoted
fn arg_text(arguments: &Value, key: &str, default: &str) -> String {
    match arguments.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => default.to_string(),
        Some(other) => other.to_string(),
    }
}

impl Delegation for SpecialistKind {
    fn tool_name(&self) -> &'static str {
        match self {
            SpecialistKind::Verification => "call_verification_agent",
            SpecialistKind::EmiReminder => "call_emi_reminder_agent",
            SpecialistKind::PaymentCollection => "call_payment_collection_agent",
            SpecialistKind::PaymentPlan => "call_payment_plan_agent",
            SpecialistKind::Escalation => "call_escalation_agent",
        }
    }

    fn from_tool_name(name: &str) -> Option<SpecialistKind> {
        SpecialistKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.tool_name() == name)
    }

    fn delegation_schema(&self) -> ToolSchema {
        let (description, input_schema) = match self {
            SpecialistKind::Verification => (
                "Call verification agent to handle customer identity verification tasks.",
                InputSchema::object()
                    .property("customer_phone", phone_param(), true)
                    .property("task", task_param(), true)
                    .property(
                        "verification_data",
                        PropertySchema::string("What the customer said for verification")
                            .with_default(Value::String(String::new())),
                        false,
                    ),
            ),
            SpecialistKind::EmiReminder => (
                "Call EMI reminder agent to handle payment reminders and due date information.",
                InputSchema::object()
                    .property("customer_phone", phone_param(), true)
                    .property("task", task_param(), true),
            ),
            SpecialistKind::PaymentCollection => (
                "Call payment collection agent to handle payment processing and link generation.",
                InputSchema::object()
                    .property("customer_phone", phone_param(), true)
                    .property("task", task_param(), true)
                    .property(
                        "amount",
                        PropertySchema::number("Amount the customer wants to pay")
                            .with_default(Value::from(0)),
                        false,
                    )
                    .property(
                        "payment_method",
                        PropertySchema::string("Preferred payment method")
                            .with_default(Value::String(String::new())),
                        false,
                    ),
            ),
            SpecialistKind::PaymentPlan => (
                "Call payment plan agent to handle payment plan creation and options.",
                InputSchema::object()
                    .property("customer_phone", phone_param(), true)
                    .property("task", task_param(), true)
                    .property(
                        "monthly_amount",
                        PropertySchema::number("Amount the customer can pay each month")
                            .with_default(Value::from(0)),
                        false,
                    )
                    .property(
                        "start_date",
                        PropertySchema::string("When payments should start")
                            .with_default(Value::String(String::new())),
                        false,
                    ),
            ),
            SpecialistKind::Escalation => (
                "Call escalation agent to handle customer escalations and logging.",
                InputSchema::object()
                    .property("customer_phone", phone_param(), true)
                    .property("reason", PropertySchema::string("Why the call needs a human"), true)
                    .property("details", PropertySchema::string("Relevant conversation details"), true),
            ),
        };

        ToolSchema {
            name: self.tool_name().to_string(),
            description: description.to_string(),
            input_schema,
        }
    }

    fn format_input(&self, arguments: &Value) -> String {
        let task = arg_text(arguments, "task", "");
        match self {
            SpecialistKind::Verification => format!(
                "Task: {}. Verification data: {}",
                task,
                arg_text(arguments, "verification_data", "")
            ),
            SpecialistKind::EmiReminder => format!("Task: {}", task),
            SpecialistKind::PaymentCollection => format!(
                "Task: {}. Amount: {}. Payment method: {}",
                task,
                arg_text(arguments, "amount", "0"),
                arg_text(arguments, "payment_method", "")
            ),
            SpecialistKind::PaymentPlan => format!(
                "Task: {}. Monthly amount: {}. Start date: {}",
                task,
                arg_text(arguments, "monthly_amount", "0"),
                arg_text(arguments, "start_date", "")
            ),
            SpecialistKind::Escalation => format!(
                "Escalation reason: {}. Details: {}",
                arg_text(arguments, "reason", ""),
                arg_text(arguments, "details", "")
            ),
        }
    }

    fn fallback_output(&self) -> String {
        format!("{} agent completed the task.", self.display_name())
    }
}

/// What a specialist run produced
#[derive(Debug, Clone)]
pub struct SpecialistReport {
    pub output: String,
    pub invocations: Vec<ToolInvocation>,
}

/// A specialist sub-agent
pub struct Specialist {
    kind: SpecialistKind,
    prompt: PromptTemplate,
    tools: ToolRegistry,
    executor: AgentExecutor,
}

impl Specialist {
    pub fn new(
        kind: SpecialistKind,
        prompt: PromptTemplate,
        directory: Arc<dyn CustomerDirectory>,
        executor: AgentExecutor,
    ) -> Self {
        Self {
            kind,
            prompt,
            tools: specialist_registry(kind, directory),
            executor,
        }
    }

    pub fn kind(&self) -> SpecialistKind {
        self.kind
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run the specialist for the customer on the call
    ///
    /// Never fails: executor errors are turned into a report the
    /// orchestrator can read.
    pub async fn handle(&self, customer_phone: &str, arguments: &Value) -> SpecialistReport {
        let input = self.kind.format_input(arguments);

        let mut vars = HashMap::new();
        vars.insert("customer_phone", customer_phone.to_string());
        let system_prompt = self.prompt.render(&vars);

        tracing::info!(specialist = %self.kind, input = %input, "Delegating to specialist");

        match self.executor.run(&system_prompt, &input, &self.tools).await {
            Ok(outcome) => {
                let output = if outcome.output.trim().is_empty() {
                    self.kind.fallback_output()
                } else {
                    outcome.output
                };
                SpecialistReport {
                    output,
                    invocations: outcome.invocations,
                }
            }
            Err(e) => {
                tracing::error!(specialist = %self.kind, error = %e, "Specialist failed");
                SpecialistReport {
                    output: format!("{} agent error: {}", self.kind.display_name(), e),
                    invocations: Vec::new(),
                }
            }
        }
    }
}
