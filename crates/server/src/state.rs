//! Application state
//!
//! Shared across all handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use loan_advisor_agent::LoanAdvisor;
use loan_advisor_config::Settings;
use loan_advisor_core::LanguageModel;
use loan_advisor_telephony::Dialer;

use crate::calls::CallRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub advisor: Arc<LoanAdvisor>,
    pub calls: Arc<CallRegistry>,
    pub llm: Arc<dyn LanguageModel>,
    /// Absent when Twilio credentials are not configured
    pub dialer: Option<Arc<dyn Dialer>>,
    /// Absent when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Settings, llm: Arc<dyn LanguageModel>, advisor: Arc<LoanAdvisor>) -> Self {
        let calls = Arc::new(CallRegistry::from_config(&config.telephony, advisor.clone()));
        Self {
            config: Arc::new(config),
            advisor,
            calls,
            llm,
            dialer: None,
            metrics: None,
        }
    }

    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = Some(dialer);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Public URL for a webhook path, e.g. `/voice/process`
    pub fn webhook_url(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.config.telephony.public_base_url.trim_end_matches('/'),
            path
        )
    }
}
