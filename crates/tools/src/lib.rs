//! Loan servicing tools
//!
//! Six deterministic tools over the customer directory, plus a registry
//! that validates arguments and runs each tool under its timeout.

pub mod loan;
pub mod registry;

pub use loan::{
    CheckOverdueStatusTool, CreateEscalationTicketTool, CreatePaymentPlanTool,
    GeneratePaymentLinkTool, GetEmiDetailsTool, VerifyCustomerIdentityTool, CUSTOMER_NOT_FOUND,
};
pub use registry::{create_loan_registry, specialist_registry, ToolExecutor, ToolRegistry};

// Re-export the tool interface for implementors
pub use loan_advisor_core::{
    InputSchema, PropertySchema, Tool, ToolError, ToolErrorCode, ToolOutput, ToolSchema,
};
