//! Loan advisor conversation manager
//!
//! Owns one `ConversationState` per customer phone and drives the
//! orchestrator turn by turn. Locks are released before the orchestrator
//! is awaited; state is re-read afterwards.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use loan_advisor_config::Settings;
use loan_advisor_core::{
    ConversationState, ConversationStep, CustomerDirectory, LanguageModel, Speaker,
};

use crate::executor::AgentExecutor;
use crate::orchestrator::{apply_invocations, Orchestrator};

/// Reply when a turn arrives for a phone with no conversation
pub const RESTART_MESSAGE: &str =
    "I'm sorry, but I don't have an active conversation for this number. Please restart the call.";

/// Reply when the orchestrator fails
pub const TECHNICAL_DIFFICULTY_MESSAGE: &str =
    "I apologize for the technical difficulty. Please contact our customer service team.";

/// Reply when the orchestrator produces no text
const EMPTY_RESPONSE_MESSAGE: &str =
    "I apologize, but I'm having trouble processing your request right now.";

/// Conversation manager for all active calls
pub struct LoanAdvisor {
    directory: Arc<dyn CustomerDirectory>,
    orchestrator: Orchestrator,
    company_name: String,
    history_window: usize,
    conversations: RwLock<HashMap<String, ConversationState>>,
}

impl LoanAdvisor {
    pub fn new(
        directory: Arc<dyn CustomerDirectory>,
        orchestrator: Orchestrator,
        company_name: impl Into<String>,
        history_window: usize,
    ) -> Self {
        Self {
            directory,
            orchestrator,
            company_name: company_name.into(),
            history_window,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Wire the orchestrator and specialists from settings
    pub fn from_settings(
        settings: &Settings,
        llm: Arc<dyn LanguageModel>,
        directory: Arc<dyn CustomerDirectory>,
    ) -> Self {
        let agent = &settings.agent;
        let orchestrator = Orchestrator::from_prompts(
            &settings.prompts,
            directory.clone(),
            AgentExecutor::new(llm.clone(), agent.max_iterations),
            AgentExecutor::new(llm, agent.specialist_max_iterations),
        );

        Self::new(directory, orchestrator, agent.company_name.clone(), agent.history_window)
    }

    pub fn directory(&self) -> &Arc<dyn CustomerDirectory> {
        &self.directory
    }

    pub fn has_customer(&self, phone: &str) -> bool {
        self.directory.contains(phone)
    }

    /// Open a conversation and return the greeting
    ///
    /// Unknown phones get an apology and no conversation is kept.
    pub fn start_conversation(&self, phone: &str) -> String {
        let customer = match self.directory.get(phone) {
            Some(c) => c,
            None => {
                tracing::warn!(phone = %phone, "No customer record for phone");
                return format!(
                    "I'm sorry, but I couldn't find a customer record for the phone number {}. \
                     Please contact our customer service team for assistance.",
                    phone
                );
            }
        };

        let greeting = format!(
            "Hello, this is your loan advisor from {}. Are we speaking with {}?",
            self.company_name, customer.full_name
        );

        let mut state = ConversationState::new(phone);
        state.customer = Some(customer);
        state.current_step = ConversationStep::NameVerification;
        state.record_message(
            Speaker::Agent,
            greeting.clone(),
            Some(ConversationStep::NameVerification),
        );

        self.conversations.write().insert(phone.to_string(), state);
        tracing::info!(phone = %phone, "Conversation started");
        greeting
    }

    /// Handle one customer utterance and return the spoken reply
    pub async fn continue_conversation(&self, phone: &str, text: &str) -> String {
        let (snapshot, history) = {
            let mut conversations = self.conversations.write();
            let state = match conversations.get_mut(phone) {
                Some(state) => state,
                None => return RESTART_MESSAGE.to_string(),
            };

            state.user_response = text.to_string();
            let step = state.current_step;
            state.record_message(Speaker::Customer, text, Some(step));
            (state.snapshot(), state.format_history(self.history_window))
        };

        let started = Instant::now();
        let result = self.orchestrator.run_turn(phone, &snapshot, &history, text).await;
        metrics::histogram!("loan_advisor_orchestrator_latency_seconds")
            .record(started.elapsed().as_secs_f64());

        let mut conversations = self.conversations.write();
        let state = match conversations.get_mut(phone) {
            Some(state) => state,
            // Call ended while the model was thinking
            None => return RESTART_MESSAGE.to_string(),
        };

        match result {
            Ok(outcome) => {
                metrics::counter!("loan_advisor_turns_total", "outcome" => "ok").increment(1);
                apply_invocations(state, &outcome.invocations);

                let response = if outcome.response.trim().is_empty() {
                    EMPTY_RESPONSE_MESSAGE.to_string()
                } else {
                    outcome.response
                };

                tracing::info!(
                    phone = %phone,
                    step = %state.current_step,
                    verification = state.verification_status.as_str(),
                    tools = outcome.invocations.len(),
                    "Turn completed"
                );

                let step = state.current_step;
                state.record_message(Speaker::Agent, response.clone(), Some(step));
                response
            }
            Err(e) => {
                metrics::counter!("loan_advisor_turns_total", "outcome" => "error").increment(1);
                tracing::error!(phone = %phone, error = %e, "Orchestrator turn failed");
                state.record_message(
                    Speaker::Agent,
                    TECHNICAL_DIFFICULTY_MESSAGE,
                    Some(ConversationStep::Error),
                );
                TECHNICAL_DIFFICULTY_MESSAGE.to_string()
            }
        }
    }

    /// Drop a conversation, returning its final state
    pub fn end_conversation(&self, phone: &str) -> Option<ConversationState> {
        let removed = self.conversations.write().remove(phone);
        if removed.is_some() {
            tracing::info!(phone = %phone, "Conversation ended");
        }
        removed
    }

    /// Copy of the current state
    pub fn conversation(&self, phone: &str) -> Option<ConversationState> {
        self.conversations.read().get(phone).cloned()
    }

    /// Whether the conversation is complete or escalated
    pub fn is_finished(&self, phone: &str) -> bool {
        self.conversations
            .read()
            .get(phone)
            .map(ConversationState::is_finished)
            .unwrap_or(false)
    }

    pub fn active_conversations(&self) -> usize {
        self.conversations.read().len()
    }
}
