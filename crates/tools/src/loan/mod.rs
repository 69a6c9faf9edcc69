//! Loan servicing tools
//!
//! Every tool takes the customer `phone`. An unknown phone is not an error:
//! the tool answers `{"success": false, "message": "Customer not found"}` so
//! the model can react to it.

mod emi;
mod escalation;
mod payment;
mod plan;
mod verification;

pub use emi::{CheckOverdueStatusTool, GetEmiDetailsTool};
pub use escalation::CreateEscalationTicketTool;
pub use payment::GeneratePaymentLinkTool;
pub use plan::CreatePaymentPlanTool;
pub use verification::VerifyCustomerIdentityTool;

use loan_advisor_core::{Customer, CustomerDirectory, PropertySchema, ToolError, ToolOutput};
use serde_json::{json, Value};

/// Message for tools called with a phone that is not on file
pub const CUSTOMER_NOT_FOUND: &str = "Customer not found";

/// Timeout for directory-backed tools
pub(crate) const LOAN_TOOL_TIMEOUT_SECS: u64 = 10;

pub(crate) fn phone_property() -> PropertySchema {
    PropertySchema::string("Customer phone number in E.164 format")
}

/// Required string argument
pub(crate) fn str_arg<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::invalid_params(format!("{} is required", key)))
}

/// Optional string argument, empty when absent
pub(crate) fn opt_str_arg<'a>(input: &'a Value, key: &str) -> &'a str {
    input.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

/// Required finite number argument; numeric strings are accepted
pub(crate) fn number_arg(input: &Value, key: &str) -> Result<f64, ToolError> {
    let value = input
        .get(key)
        .ok_or_else(|| ToolError::invalid_params(format!("{} is required", key)))?;

    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| ToolError::invalid_params(format!("{} must be a number", key)))
}

/// Look up the customer, or produce the not-found answer
pub(crate) fn lookup(directory: &dyn CustomerDirectory, phone: &str) -> Result<Customer, ToolOutput> {
    directory.get(phone).ok_or_else(|| {
        tracing::debug!(phone = %phone, "Tool called for unknown customer");
        ToolOutput::json(json!({ "success": false, "message": CUSTOMER_NOT_FOUND }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_arg() {
        let input = json!({"a": 12.5, "b": "40", "c": "abc"});
        assert_eq!(number_arg(&input, "a").unwrap(), 12.5);
        assert_eq!(number_arg(&input, "b").unwrap(), 40.0);
        assert!(number_arg(&input, "c").is_err());
        assert!(number_arg(&input, "d").is_err());

        let input = json!({"nan": "NaN", "inf": "inf", "neg": "-infinity"});
        assert!(number_arg(&input, "nan").is_err());
        assert!(number_arg(&input, "inf").is_err());
        assert!(number_arg(&input, "neg").is_err());
    }

    #[test]
    fn test_str_args() {
        let input = json!({"phone": "+1", "n": 3});
        assert_eq!(str_arg(&input, "phone").unwrap(), "+1");
        assert!(str_arg(&input, "n").is_err());
        assert_eq!(opt_str_arg(&input, "missing"), "");
    }
}
