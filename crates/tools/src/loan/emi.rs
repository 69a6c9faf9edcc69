//! EMI detail and overdue tools

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use std::sync::Arc;

use loan_advisor_core::{CustomerDirectory, InputSchema, Tool, ToolError, ToolOutput, ToolSchema};

use super::{lookup, phone_property, str_arg, LOAN_TOOL_TIMEOUT_SECS};

/// Next EMI, balance and charges for a customer
pub struct GetEmiDetailsTool {
    directory: Arc<dyn CustomerDirectory>,
}

impl GetEmiDetailsTool {
    pub fn new(directory: Arc<dyn CustomerDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for GetEmiDetailsTool {
    fn name(&self) -> &str {
        "get_emi_details"
    }

    fn description(&self) -> &str {
        "Get EMI details for the customer."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object().property("phone", phone_property(), true),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let phone = str_arg(&input, "phone")?;
        let customer = match lookup(self.directory.as_ref(), phone) {
            Ok(c) => c,
            Err(not_found) => return Ok(not_found),
        };

        Ok(ToolOutput::json(json!({
            "success": true,
            "emi_details": customer.emi_details(),
        })))
    }

    fn timeout_secs(&self) -> u64 {
        LOAN_TOOL_TIMEOUT_SECS
    }
}

/// Whether the next EMI is past due
pub struct CheckOverdueStatusTool {
    directory: Arc<dyn CustomerDirectory>,
    /// Fixed evaluation date; the local calendar date when unset
    today: Option<NaiveDate>,
}

impl CheckOverdueStatusTool {
    pub fn new(directory: Arc<dyn CustomerDirectory>) -> Self {
        Self {
            directory,
            today: None,
        }
    }

    /// Evaluate against a fixed date
    pub fn as_of(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[async_trait]
impl Tool for CheckOverdueStatusTool {
    fn name(&self) -> &str {
        "check_overdue_status"
    }

    fn description(&self) -> &str {
        "Check if customer has any overdue payments."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object().property("phone", phone_property(), true),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let phone = str_arg(&input, "phone")?;
        let customer = match lookup(self.directory.as_ref(), phone) {
            Ok(c) => c,
            Err(not_found) => return Ok(not_found),
        };

        let status = customer.overdue_status(self.today());

        Ok(ToolOutput::json(json!({
            "success": true,
            "is_overdue": status.is_overdue,
            "days_overdue": status.days_overdue,
            "overdue_amount": status.overdue_amount,
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

    fn directory() -> Arc<dyn CustomerDirectory> {
        Arc::new(InMemoryCustomerDirectory::with_samples())
    }

    #[tokio::test]
    async fn test_emi_details() {
        let output = GetEmiDetailsTool::new(directory())
            .execute(json!({"phone": "+1234567892"}))
            .await
            .unwrap();
        let json = output.to_json();
        assert_eq!(json["success"], true);
        assert_eq!(json["emi_details"]["next_emi_amount"], 1100.0);
        assert_eq!(json["emi_details"]["next_due_date"], "2025-06-18");
        assert_eq!(json["emi_details"]["loan_number"], "LN009012");
        assert_eq!(json["emi_details"]["late_fee"], 75.0);
    }

    #[tokio::test]
    async fn test_emi_details_unknown() {
        let output = GetEmiDetailsTool::new(directory())
            .execute(json!({"phone": "+10000000000"}))
            .await
            .unwrap();
        assert_eq!(output.to_json()["success"], false);
    }

    #[tokio::test]
    async fn test_overdue_status() {
        let tool = CheckOverdueStatusTool::new(directory())
            .as_of(NaiveDate::from_ymd_opt(2025, 6, 20).unwrap());

        let json = tool
            .execute(json!({"phone": "+1234567892"}))
            .await
            .unwrap()
            .to_json();
        assert_eq!(json["is_overdue"], true);
        assert_eq!(json["days_overdue"], 2);
        assert_eq!(json["overdue_amount"], 1100.0);

        let json = tool
            .execute(json!({"phone": "+1234567891"}))
            .await
            .unwrap()
            .to_json();
        assert_eq!(json["is_overdue"], false);
        assert_eq!(json["days_overdue"], 0);
        assert_eq!(json["overdue_amount"], 0.0);
    }
}
