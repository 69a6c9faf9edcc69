//! Identity verification tool

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use loan_advisor_core::{
    CustomerDirectory, InputSchema, PropertySchema, Tool, ToolError, ToolOutput, ToolSchema,
};

use super::{lookup, phone_property, str_arg, LOAN_TOOL_TIMEOUT_SECS};

/// Verify a caller against the SSN last four digits on file
pub struct VerifyCustomerIdentityTool {
    directory: Arc<dyn CustomerDirectory>,
}

impl VerifyCustomerIdentityTool {
    pub fn new(directory: Arc<dyn CustomerDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for VerifyCustomerIdentityTool {
    fn name(&self) -> &str {
        "verify_customer_identity"
    }

    fn description(&self) -> &str {
        "Verify customer identity using SSN last 4 digits."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object()
                .property("phone", phone_property(), true)
                .property(
                    "verification_data",
                    PropertySchema::string("Last 4 digits of the customer's SSN as spoken"),
                    true,
                ),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let phone = str_arg(&input, "phone")?;
        let verification_data = str_arg(&input, "verification_data")?;

        let customer = match lookup(self.directory.as_ref(), phone) {
            Ok(c) => c,
            Err(not_found) => return Ok(not_found),
        };

        let verified = customer.matches_ssn(verification_data);
        tracing::info!(
            customer_id = %customer.customer_id,
            verified,
            "Identity verification attempted"
        );

        let result = if verified {
            json!({
                "success": true,
                "message": "Customer identity verified successfully"
            })
        } else {
            json!({
                "success": false,
                "message": "Verification failed. Information does not match our records"
            })
        };

        Ok(ToolOutput::json(result))
    }

    fn timeout_secs(&self) -> u64 {
        LOAN_TOOL_TIMEOUT_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loan_advisor_core::InMemoryCustomerDirectory;

    fn tool() -> VerifyCustomerIdentityTool {
        VerifyCustomerIdentityTool::new(Arc::new(InMemoryCustomerDirectory::with_samples()))
    }

    #[tokio::test]
    async fn test_verification_success() {
        let output = tool()
            .execute(json!({"phone": "+1234567891", "verification_data": "5678"}))
            .await
            .unwrap();
        let json = output.to_json();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Customer identity verified successfully");
    }

    #[tokio::test]
    async fn test_verification_mismatch() {
        let output = tool()
            .execute(json!({"phone": "+1234567891", "verification_data": "1234"}))
            .await
            .unwrap();
        let json = output.to_json();
        assert_eq!(json["success"], false);
        assert_eq!(
            json["message"],
            "Verification failed. Information does not match our records"
        );
    }

    #[tokio::test]
    async fn test_verification_unknown_customer() {
        let output = tool()
            .execute(json!({"phone": "+19999999999", "verification_data": "5678"}))
            .await
            .unwrap();
        assert_eq!(output.to_json()["message"], "Customer not found");
    }
}
