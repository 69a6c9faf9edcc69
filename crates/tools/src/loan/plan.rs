//! Payment plan tool

use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;

use loan_advisor_core::{
    CustomerDirectory, InputSchema, PropertySchema, Tool, ToolError, ToolOutput, ToolSchema,
};

use super::{lookup, number_arg, phone_property, str_arg, LOAN_TOOL_TIMEOUT_SECS};

/// Spread the outstanding balance over monthly instalments
pub struct CreatePaymentPlanTool {
    directory: Arc<dyn CustomerDirectory>,
}

impl CreatePaymentPlanTool {
    pub fn new(directory: Arc<dyn CustomerDirectory>) -> Self {
        Self { directory }
    }
}

/// Months needed to clear `balance` at `monthly_amount`, rounding up
fn months_needed(balance: f64, monthly_amount: f64) -> u32 {
    (balance / monthly_amount).ceil().max(0.0) as u32
}

/// Date of the final instalment, when the start date is an ISO date
fn estimated_completion(start_date: &str, total_months: u32) -> String {
    NaiveDate::parse_from_str(start_date.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|start| start.checked_add_months(Months::new(total_months.saturating_sub(1))))
        .map(|end| end.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Based on monthly payments".to_string())
}

#[async_trait]
impl Tool for CreatePaymentPlanTool {
    fn name(&self) -> &str {
        "create_payment_plan"
    }

    fn description(&self) -> &str {
        "Create a payment plan for the customer."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object()
                .property("phone", phone_property(), true)
                .property(
                    "monthly_amount",
                    PropertySchema::number("Amount the customer can pay each month"),
                    true,
                )
                .property(
                    "start_date",
                    PropertySchema::string("First payment date, preferably YYYY-MM-DD"),
                    true,
                ),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let phone = str_arg(&input, "phone")?;
        let monthly_amount = number_arg(&input, "monthly_amount")?;
        let start_date = str_arg(&input, "start_date")?;

        let customer = match lookup(self.directory.as_ref(), phone) {
            Ok(c) => c,
            Err(not_found) => return Ok(not_found),
        };

        if monthly_amount <= 0.0 {
            return Err(ToolError::invalid_params(
                "monthly_amount must be greater than zero",
            ));
        }

        let total_months = months_needed(customer.current_balance, monthly_amount);
        let suffix: u32 = rand::thread_rng().gen_range(1000..=9999);
        let plan_id = format!("PLAN_{}_{}", customer.customer_id, suffix);

        tracing::info!(
            plan_id = %plan_id,
            monthly_amount,
            total_months,
            "Payment plan created"
        );

        Ok(ToolOutput::json(json!({
            "success": true,
            "plan_id": plan_id,
            "monthly_amount": monthly_amount,
            "start_date": start_date,
            "total_months": total_months,
            "total_amount": customer.current_balance,
            "estimated_completion": estimated_completion(start_date, total_months),
        })))
    }

    fn timeout_secs(&self) -> u64 {
        LOAN_TOOL_TIMEOUT_SECS
    }
}
