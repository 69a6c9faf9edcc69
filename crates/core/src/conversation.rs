//! Conversation state tracked per customer call

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::customer::Customer;

/// Messages between summary refreshes
const SUMMARY_INTERVAL: usize = 4;

/// Who spoke a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Customer,
    Agent,
}

/// Nominal conversation steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStep {
    #[default]
    Initial,
    NameVerification,
    SsnVerification,
    EmiReminder,
    PaymentCollection,
    PaymentPlan,
    Escalation,
    Closing,
    Error,
}

impl ConversationStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStep::Initial => "initial",
            ConversationStep::NameVerification => "name_verification",
            ConversationStep::SsnVerification => "ssn_verification",
            ConversationStep::EmiReminder => "emi_reminder",
            ConversationStep::PaymentCollection => "payment_collection",
            ConversationStep::PaymentPlan => "payment_plan",
            ConversationStep::Escalation => "escalation",
            ConversationStep::Closing => "closing",
            ConversationStep::Error => "error",
        }
    }
}

impl fmt::Display for ConversationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity verification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Failed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Failed => "failed",
        }
    }
}

/// A single recorded utterance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<ConversationStep>,
}

impl ConversationMessage {
    /// Render as a history line, e.g. `Customer [emi_reminder]: yes`
    pub fn format_line(&self) -> String {
        let prefix = match self.role {
            Speaker::Agent => "AI",
            Speaker::Customer => "Customer",
        };
        match self.step {
            Some(step) => format!("{} [{}]: {}", prefix, step, self.content),
            None => format!("{}: {}", prefix, self.content),
        }
    }
}

/// Per-customer dialogue state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub customer_phone: String,
    pub customer: Option<Customer>,
    pub verification_status: VerificationStatus,
    pub current_step: ConversationStep,
    pub max_verification_attempts: u32,
    pub user_response: String,
    pub escalation_needed: bool,
    pub conversation_complete: bool,
    pub history: Vec<ConversationMessage>,
    pub context_summary: String,
}

impl ConversationState {
    pub fn new(customer_phone: impl Into<String>) -> Self {
        Self {
            customer_phone: customer_phone.into(),
            customer: None,
            verification_status: VerificationStatus::Pending,
            current_step: ConversationStep::Initial,
            max_verification_attempts: 1,
            user_response: String::new(),
            escalation_needed: false,
            conversation_complete: false,
            history: Vec::new(),
            context_summary: String::new(),
        }
    }

    /// Append a message; the summary is refreshed every fourth message
    pub fn record_message(
        &mut self,
        role: Speaker,
        content: impl Into<String>,
        step: Option<ConversationStep>,
    ) {
        self.history.push(ConversationMessage {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            step,
        });

        if self.history.len() % SUMMARY_INTERVAL == 0 {
            self.refresh_summary();
        }
    }

    /// Last `max_messages` messages, one per line
    pub fn format_history(&self, max_messages: usize) -> String {
        let start = self.history.len().saturating_sub(max_messages);
        self.history[start..]
            .iter()
            .map(ConversationMessage::format_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Rebuild the short summary from verification, step and escalation
    pub fn refresh_summary(&mut self) {
        let mut parts = Vec::new();

        match self.verification_status {
            VerificationStatus::Verified => parts.push("Customer identity verified"),
            VerificationStatus::Failed => parts.push("Customer verification failed"),
            VerificationStatus::Pending => {}
        }

        match self.current_step {
            ConversationStep::EmiReminder => parts.push("EMI reminder provided"),
            ConversationStep::PaymentCollection => parts.push("Payment collection in progress"),
            ConversationStep::PaymentPlan => parts.push("Payment plan discussion"),
            _ => {}
        }

        if self.escalation_needed {
            parts.push("Escalation required");
        }

        self.context_summary = parts.join(" | ");
    }

    /// State fields handed to the orchestrator
    pub fn snapshot(&self) -> ConversationSnapshot {
        let customer = self.customer.as_ref();
        ConversationSnapshot {
            current_step: self.current_step,
            verification_status: self.verification_status,
            max_attempts: self.max_verification_attempts,
            escalation_needed: self.escalation_needed,
            customer_name: customer
                .map(|c| c.full_name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            customer_balance: customer.map(|c| c.current_balance).unwrap_or(0.0),
            next_emi_amount: customer.map(|c| c.next_emi_amount).unwrap_or(0.0),
            next_due_date: customer.map(|c| c.next_due_date),
        }
    }

    /// Whether the call should wrap up
    pub fn is_finished(&self) -> bool {
        self.conversation_complete || self.escalation_needed
    }
}

/// Orchestrator view of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub current_step: ConversationStep,
    pub verification_status: VerificationStatus,
    pub max_attempts: u32,
    pub escalation_needed: bool,
    pub customer_name: String,
    pub customer_balance: f64,
    pub next_emi_amount: f64,
    pub next_due_date: Option<NaiveDate>,
}

impl ConversationSnapshot {
    /// Render for prompt substitution
    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::sample_customers;

    fn state_with_customer() -> ConversationState {
        let mut state = ConversationState::new("+1234567891");
        state.customer = sample_customers().into_iter().nth(1);
        state
    }

    #[test]
    fn test_new_state_defaults() {
        let state = ConversationState::new("+1");
        assert_eq!(state.current_step, ConversationStep::Initial);
        assert_eq!(state.verification_status, VerificationStatus::Pending);
        assert_eq!(state.max_verification_attempts, 1);
        assert!(!state.is_finished());
    }

    #[test]
    fn test_format_history_window() {
        let mut state = ConversationState::new("+1");
        state.record_message(Speaker::Agent, "Hello", Some(ConversationStep::NameVerification));
        state.record_message(Speaker::Customer, "Yes", Some(ConversationStep::NameVerification));
        state.record_message(Speaker::Customer, "Hmm", None);

        assert_eq!(
            state.format_history(10),
            "AI [name_verification]: Hello\nCustomer [name_verification]: Yes\nCustomer: Hmm"
        );
        assert_eq!(state.format_history(1), "Customer: Hmm");
        assert_eq!(state.format_history(0), "");
    }

    #[test]
    fn test_summary_refreshes_every_fourth_message() {
        let mut state = ConversationState::new("+1");
        state.verification_status = VerificationStatus::Verified;
        state.current_step = ConversationStep::PaymentPlan;
        state.escalation_needed = true;

        for i in 0..3 {
            state.record_message(Speaker::Customer, format!("m{}", i), None);
        }
        assert_eq!(state.context_summary, "");

        state.record_message(Speaker::Agent, "m3", None);
        assert_eq!(
            state.context_summary,
            "Customer identity verified | Payment plan discussion | Escalation required"
        );
    }

    #[test]
    fn test_summary_failed_verification() {
        let mut state = ConversationState::new("+1");
        state.verification_status = VerificationStatus::Failed;
        state.current_step = ConversationStep::Closing;
        state.refresh_summary();
        assert_eq!(state.context_summary, "Customer verification failed");
    }

    #[test]
    fn test_snapshot() {
        let snapshot = state_with_customer().snapshot();
        assert_eq!(snapshot.customer_name, "Sarah Johnson");
        assert_eq!(snapshot.customer_balance, 8500.0);
        assert_eq!(snapshot.next_emi_amount, 425.0);

        let rendered = snapshot.render();
        assert!(rendered.contains("\"current_step\":\"initial\""));
        assert!(rendered.contains("\"next_due_date\":\"2025-07-20\""));

        let unknown = ConversationState::new("+1").snapshot();
        assert_eq!(unknown.customer_name, "Unknown");
        assert_eq!(unknown.customer_balance, 0.0);
        assert!(unknown.next_due_date.is_none());
    }

    #[test]
    fn test_step_labels() {
        assert_eq!(ConversationStep::SsnVerification.to_string(), "ssn_verification");
        assert_eq!(
            serde_json::to_value(ConversationStep::EmiReminder).unwrap(),
            "emi_reminder"
        );
    }
}
