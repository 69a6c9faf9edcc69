//! Orchestrator agent
//!
//! The orchestrator talks to the customer. It sees the five delegation
//! tools and `end_call`; everything it learns about the customer comes
//! back from specialists. Tool outcomes are journaled so the conversation
//! state can be updated deterministically after the turn.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use loan_advisor_config::PromptsConfig;
use loan_advisor_core::{
    ConversationSnapshot, ConversationState, ConversationStep, CustomerDirectory, InputSchema,
    PropertySchema, SpecialistKind, Tool, ToolError, ToolOutput, ToolSchema, VerificationStatus,
};
use loan_advisor_llm::PromptTemplate;
use loan_advisor_tools::{ToolRegistry, CUSTOMER_NOT_FOUND};

use crate::executor::{AgentExecutor, ToolInvocation};
use crate::specialist::{Delegation, Specialist};
use crate::AgentError;

/// Orchestrator tool that closes the call
pub const END_CALL_TOOL: &str = "end_call";

/// A specialist run is several model round trips
const DELEGATION_TIMEOUT_SECS: u64 = 120;

type Journal = Arc<Mutex<Vec<ToolInvocation>>>;

/// Result of one orchestrator turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response: String,
    /// Every tool that ran this turn, specialist tools included, in order
    pub invocations: Vec<ToolInvocation>,
}

impl TurnOutcome {
    pub fn called(&self, tool: &str) -> bool {
        self.invocations.iter().any(|inv| inv.name == tool)
    }
}

/// Delegation tool bound to the current call's customer
struct DelegationTool {
    specialist: Arc<Specialist>,
    customer_phone: String,
    journal: Journal,
}

#[async_trait]
impl Tool for DelegationTool {
    fn name(&self) -> &str {
        self.specialist.kind().tool_name()
    }

    fn description(&self) -> &str {
        "Delegate to a specialist agent"
    }

    fn schema(&self) -> ToolSchema {
        self.specialist.kind().delegation_schema()
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let report = self.specialist.handle(&self.customer_phone, &input).await;

        let mut journal = self.journal.lock();
        journal.extend(report.invocations);
        journal.push(ToolInvocation {
            name: self.name().to_string(),
            arguments: input,
            result: Value::String(report.output.clone()),
            success: true,
        });

        Ok(ToolOutput::text(report.output))
    }

    fn timeout_secs(&self) -> u64 {
        DELEGATION_TIMEOUT_SECS
    }
}

/// Marks the conversation for closing
struct EndCallTool {
    journal: Journal,
}

#[async_trait]
impl Tool for EndCallTool {
    fn name(&self) -> &str {
        END_CALL_TOOL
    }

    fn description(&self) -> &str {
        "End the call once the customer's needs are handled or they ask to finish."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object().property(
                "reason",
                PropertySchema::string("Why the call is ending"),
                true,
            ),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let result = json!({
            "success": true,
            "message": "The call will end after your closing words",
        });

        self.journal.lock().push(ToolInvocation {
            name: END_CALL_TOOL.to_string(),
            arguments: input,
            result: result.clone(),
            success: true,
        });

        Ok(ToolOutput::json(result))
    }
}

/// Top-level agent coordinating the specialists
pub struct Orchestrator {
    prompt: PromptTemplate,
    executor: AgentExecutor,
    specialists: Vec<Arc<Specialist>>,
}

impl Orchestrator {
    pub fn new(
        prompt: PromptTemplate,
        executor: AgentExecutor,
        specialists: Vec<Specialist>,
    ) -> Self {
        Self {
            prompt,
            executor,
            specialists: specialists.into_iter().map(Arc::new).collect(),
        }
    }

    /// Orchestrator plus all five specialists from configured prompts
    pub fn from_prompts(
        prompts: &PromptsConfig,
        directory: Arc<dyn CustomerDirectory>,
        executor: AgentExecutor,
        specialist_executor: AgentExecutor,
    ) -> Self {
        let specialists = SpecialistKind::ALL
            .iter()
            .map(|kind| {
                let prompt = match kind {
                    SpecialistKind::Verification => &prompts.verification,
                    SpecialistKind::EmiReminder => &prompts.emi_reminder,
                    SpecialistKind::PaymentCollection => &prompts.payment_collection,
                    SpecialistKind::PaymentPlan => &prompts.payment_plan,
                    SpecialistKind::Escalation => &prompts.escalation,
                };
                Specialist::new(
                    *kind,
                    PromptTemplate::new(prompt.as_str()),
                    directory.clone(),
                    specialist_executor.clone(),
                )
            })
            .collect();

        Self::new(PromptTemplate::new(prompts.orchestrator.as_str()), executor, specialists)
    }

    /// Tools offered to the orchestrator for one call
    fn turn_registry(&self, customer_phone: &str, journal: &Journal) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for specialist in &self.specialists {
            registry.register(DelegationTool {
                specialist: specialist.clone(),
                customer_phone: customer_phone.to_string(),
                journal: journal.clone(),
            });
        }
        registry.register(EndCallTool {
            journal: journal.clone(),
        });
        registry
    }

    /// Run one customer turn
    pub async fn run_turn(
        &self,
        customer_phone: &str,
        snapshot: &ConversationSnapshot,
        history: &str,
        input: &str,
    ) -> Result<TurnOutcome, AgentError> {
        let mut vars = HashMap::new();
        vars.insert("conversation_state", snapshot.render());
        vars.insert("customer_phone", customer_phone.to_string());
        vars.insert("conversation_history", history.to_string());
        let system_prompt = self.prompt.render(&vars);

        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let registry = self.turn_registry(customer_phone, &journal);

        let outcome = self.executor.run(&system_prompt, input, &registry).await?;

        let invocations = std::mem::take(&mut *journal.lock());
        tracing::debug!(
            iterations = outcome.iterations,
            tools = invocations.len(),
            "Orchestrator turn finished"
        );

        Ok(TurnOutcome {
            response: outcome.output,
            invocations,
        })
    }
}

/// Update conversation state from what the tools did this turn
pub fn apply_invocations(state: &mut ConversationState, invocations: &[ToolInvocation]) {
    for invocation in invocations {
        if let Some(kind) = SpecialistKind::from_tool_name(&invocation.name) {
            state.current_step = kind.step();
            continue;
        }

        match invocation.name.as_str() {
            "verify_customer_identity" => {
                if !targets_caller(state, invocation) || reports_unknown_customer(invocation) {
                    continue;
                }
                match invocation.reported_success() {
                    Some(true) => state.verification_status = VerificationStatus::Verified,
                    Some(false) => state.verification_status = VerificationStatus::Failed,
                    None => {}
                }
            }
            "create_escalation_ticket" => {
                if targets_caller(state, invocation) && invocation.reported_success() == Some(true) {
                    state.escalation_needed = true;
                    state.current_step = ConversationStep::Escalation;
                }
            }
            END_CALL_TOOL => {
                state.conversation_complete = true;
                state.current_step = ConversationStep::Closing;
            }
            _ => {}
        }
    }
}

/// Tool outcomes only count for the customer on this call
fn targets_caller(state: &ConversationState, invocation: &ToolInvocation) -> bool {
    let matches = invocation.arguments.get("phone").and_then(Value::as_str)
        == Some(state.customer_phone.as_str());
    if !matches {
        tracing::warn!(
            tool = %invocation.name,
            caller = %state.customer_phone,
            phone = ?invocation.arguments.get("phone"),
            "Ignoring tool outcome for another phone"
        );
    }
    matches
}

fn reports_unknown_customer(invocation: &ToolInvocation) -> bool {
    invocation.result.get("message").and_then(Value::as_str) == Some(CUSTOMER_NOT_FOUND)
}
