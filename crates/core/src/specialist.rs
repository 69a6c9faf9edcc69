//! Specialist sub-agents the orchestrator delegates to

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::conversation::ConversationStep;

/// The five specialist roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialistKind {
    Verification,
    EmiReminder,
    PaymentCollection,
    PaymentPlan,
    Escalation,
}

impl SpecialistKind {
    pub const ALL: [SpecialistKind; 5] = [
        SpecialistKind::Verification,
        SpecialistKind::EmiReminder,
        SpecialistKind::PaymentCollection,
        SpecialistKind::PaymentPlan,
        SpecialistKind::Escalation,
    ];

    /// Display name used in fallback and error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            SpecialistKind::Verification => "Verification",
            SpecialistKind::EmiReminder => "EMI reminder",
            SpecialistKind::PaymentCollection => "Payment collection",
            SpecialistKind::PaymentPlan => "Payment plan",
            SpecialistKind::Escalation => "Escalation",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialistKind::Verification => "verification",
            SpecialistKind::EmiReminder => "emi_reminder",
            SpecialistKind::PaymentCollection => "payment_collection",
            SpecialistKind::PaymentPlan => "payment_plan",
            SpecialistKind::Escalation => "escalation",
        }
    }

    /// Step the conversation moves to when this specialist is engaged
    pub fn step(&self) -> ConversationStep {
        match self {
            SpecialistKind::Verification => ConversationStep::SsnVerification,
            SpecialistKind::EmiReminder => ConversationStep::EmiReminder,
            SpecialistKind::PaymentCollection => ConversationStep::PaymentCollection,
            SpecialistKind::PaymentPlan => ConversationStep::PaymentPlan,
            SpecialistKind::Escalation => ConversationStep::Escalation,
        }
    }
}

impl fmt::Display for SpecialistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
