//! Escalation ticket tool

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;

use loan_advisor_core::{
    CustomerDirectory, InputSchema, PropertySchema, Tool, ToolError, ToolOutput, ToolSchema,
};

use super::{lookup, opt_str_arg, phone_property, str_arg, LOAN_TOOL_TIMEOUT_SECS};

/// Open a ticket for a human agent
pub struct CreateEscalationTicketTool {
    directory: Arc<dyn CustomerDirectory>,
}

impl CreateEscalationTicketTool {
    pub fn new(directory: Arc<dyn CustomerDirectory>) -> Self {
        Self { directory }
    }
}

/// Verification problems jump the queue
fn priority_for(reason: &str) -> &'static str {
    if reason.to_lowercase().contains("verification") {
        "high"
    } else {
        "medium"
    }
}

#[async_trait]
impl Tool for CreateEscalationTicketTool {
    fn name(&self) -> &str {
        "create_escalation_ticket"
    }

    fn description(&self) -> &str {
        "Create an escalation ticket for human intervention."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object()
                .property("phone", phone_property(), true)
                .property("reason", PropertySchema::string("Why the call is being escalated"), true)
                .property("details", PropertySchema::string("Relevant conversation details"), false),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let phone = str_arg(&input, "phone")?;
        let reason = str_arg(&input, "reason")?;
        let details = opt_str_arg(&input, "details");

        let customer = match lookup(self.directory.as_ref(), phone) {
            Ok(c) => c,
            Err(not_found) => return Ok(not_found),
        };

        let ticket_id = format!("ESC_{}", rand::thread_rng().gen_range(10000..=99999));
        let priority = priority_for(reason);

        tracing::info!(
            ticket_id = %ticket_id,
            customer_id = %customer.customer_id,
            priority,
            reason = %reason,
            details = %details,
            "Escalation ticket created"
        );

        Ok(ToolOutput::json(json!({
            "success": true,
            "ticket_id": ticket_id,
            "priority": priority,
            "estimated_response": "20 minutes",
            "message": format!("Escalation ticket {} created successfully", ticket_id),
        })))
    }

    fn timeout_secs(&self) -> u64 {
        LOAN_TOOL_TIMEOUT_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loan_advisor_core::InMemoryCustomerDirectory;

    fn tool() -> CreateEscalationTicketTool {
        CreateEscalationTicketTool::new(Arc::new(InMemoryCustomerDirectory::with_samples()))
    }

    #[test]
    fn test_priority() {
        assert_eq!(priority_for("Identity VERIFICATION failed"), "high");
        assert_eq!(priority_for("Customer dispute"), "medium");
    }

    #[tokio::test]
    async fn test_ticket() {
        let json = tool()
            .execute(json!({
                "phone": "+917008817812",
                "reason": "verification failed",
                "details": "SSN mismatch"
            }))
            .await
            .unwrap()
            .to_json();

        let ticket_id = json["ticket_id"].as_str().unwrap();
        let number: u32 = ticket_id.trim_start_matches("ESC_").parse().unwrap();
        assert!((10000..=99999).contains(&number));
        assert_eq!(json["priority"], "high");
        assert_eq!(json["estimated_response"], "20 minutes");
        assert_eq!(
            json["message"],
            format!("Escalation ticket {} created successfully", ticket_id)
        );
    }

    #[tokio::test]
    async fn test_ticket_unknown_customer() {
        let json = tool()
            .execute(json!({"phone": "+1", "reason": "complaint", "details": ""}))
            .await
            .unwrap()
            .to_json();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Customer not found");
    }
}
