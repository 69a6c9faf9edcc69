//! Shared fixtures for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use loan_advisor_agent::LoanAdvisor;
use loan_advisor_config::Settings;
use loan_advisor_core::{
    CustomerDirectory, GenerateRequest, GenerateResponse, InMemoryCustomerDirectory,
    LanguageModel, Result, ToolDefinition,
};

use crate::state::AppState;

/// Replays queued responses, then repeats a default reply
pub(crate) struct CannedLlm {
    queue: Mutex<VecDeque<GenerateResponse>>,
    available: bool,
}

impl CannedLlm {
    pub(crate) fn new(queue: Vec<GenerateResponse>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(queue.into()),
            available: true,
        })
    }

    pub(crate) fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            available: false,
        })
    }
}

#[async_trait]
impl LanguageModel for CannedLlm {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        self.generate_with_tools(request, &[]).await
    }

    async fn generate_with_tools(
        &self,
        _request: GenerateRequest,
        _tools: &[ToolDefinition],
    ) -> Result<GenerateResponse> {
        Ok(self
            .queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| GenerateResponse::text("Your next EMI is due on July 20.")))
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

pub(crate) fn directory() -> Arc<dyn CustomerDirectory> {
    Arc::new(InMemoryCustomerDirectory::with_samples())
}

pub(crate) fn test_advisor() -> Arc<LoanAdvisor> {
    let llm: Arc<dyn LanguageModel> = CannedLlm::new(Vec::new());
    Arc::new(LoanAdvisor::from_settings(&Settings::default(), llm, directory()))
}

pub(crate) fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.telephony.public_base_url = "https://abc.ngrok.io".to_string();
    settings.telephony.auth_token = "test-token".to_string();
    settings
}

pub(crate) fn test_state_with(settings: Settings, llm: Arc<dyn LanguageModel>) -> AppState {
    let advisor = Arc::new(LoanAdvisor::from_settings(&settings, llm.clone(), directory()));
    AppState::new(settings, llm, advisor)
}

pub(crate) fn test_state() -> AppState {
    test_state_with(test_settings(), CannedLlm::new(Vec::new()))
}
