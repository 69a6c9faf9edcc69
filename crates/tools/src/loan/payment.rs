//! Payment link tool

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;

use loan_advisor_core::{
    CustomerDirectory, InputSchema, PropertySchema, Tool, ToolError, ToolOutput, ToolSchema,
};

use super::{lookup, number_arg, phone_property, str_arg, LOAN_TOOL_TIMEOUT_SECS};

/// Issue a time-limited payment link
pub struct GeneratePaymentLinkTool {
    directory: Arc<dyn CustomerDirectory>,
}

impl GeneratePaymentLinkTool {
    pub fn new(directory: Arc<dyn CustomerDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for GeneratePaymentLinkTool {
    fn name(&self) -> &str {
        "generate_payment_link"
    }

    fn description(&self) -> &str {
        "Generate a secure payment link for the customer. Works for any payment method."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object()
                .property("phone", phone_property(), true)
                .property("amount", PropertySchema::number("Amount to collect"), true),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let phone = str_arg(&input, "phone")?;
        let amount = number_arg(&input, "amount")?;
        let customer = match lookup(self.directory.as_ref(), phone) {
            Ok(c) => c,
            Err(not_found) => return Ok(not_found),
        };

        if amount <= 0.0 {
            return Err(ToolError::invalid_params("amount must be greater than zero"));
        }

        let suffix: u32 = rand::thread_rng().gen_range(1000..=9999);
        let payment_id = format!("PAY_{}_{}", customer.customer_id, suffix);

        tracing::info!(payment_id = %payment_id, amount, "Payment link generated");

        Ok(ToolOutput::json(json!({
            "success": true,
            "payment_link": format!("Link {}", payment_id),
            "payment_id": payment_id,
            "amount": amount,
            "expiry_time": "10 minutes",
        })))
    }

    fn timeout_secs(&self) -> u64 {
        LOAN_TOOL_TIMEOUT_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loan_advisor_core::{InMemoryCustomerDirectory, ToolErrorCode};

    fn tool() -> GeneratePaymentLinkTool {
        GeneratePaymentLinkTool::new(Arc::new(InMemoryCustomerDirectory::with_samples()))
    }

    #[tokio::test]
    async fn test_payment_link() {
        let json = tool()
            .execute(json!({"phone": "+1234567891", "amount": 425.0}))
            .await
            .unwrap()
            .to_json();

        let payment_id = json["payment_id"].as_str().unwrap();
        assert!(payment_id.starts_with("PAY_CUST002_"));
        let suffix: u32 = payment_id.rsplit('_').next().unwrap().parse().unwrap();
        assert!((1000..=9999).contains(&suffix));
        assert_eq!(json["payment_link"], format!("Link {}", payment_id));
        assert_eq!(json["amount"], 425.0);
        assert_eq!(json["expiry_time"], "10 minutes");
    }

    #[tokio::test]
    async fn test_payment_link_rejects_non_positive() {
        let err = tool()
            .execute(json!({"phone": "+1234567891", "amount": 0}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ToolErrorCode::InvalidParams);
    }
}
