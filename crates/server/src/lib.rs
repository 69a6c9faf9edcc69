//! Loan advisor server
//!
//! Twilio voice webhooks, a small REST API for operators, Prometheus
//! metrics and the interactive dialer console.

pub mod calls;
pub mod console;
pub mod http;
pub mod metrics;
pub mod state;
pub mod voice;

#[cfg(test)]
pub(crate) mod test_support;

pub use calls::{CallRegistry, CallSession};
pub use console::{Console, ConsoleExit};
pub use http::create_router;
pub use crate::metrics::{init_metrics, metrics_handler};
pub use state::AppState;
pub use voice::is_goodbye;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Call not found: {0}")]
    CallNotFound(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid request signature")]
    InvalidSignature,

    #[error("Telephony unavailable: {0}")]
    TelephonyUnavailable(String),

    #[error("Telephony error: {0}")]
    Telephony(#[from] loan_advisor_telephony::TelephonyError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::CustomerNotFound(_)
            | ServerError::CallNotFound(_)
            | ServerError::ConversationNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidSignature => StatusCode::FORBIDDEN,
            ServerError::TelephonyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Telephony(_) => StatusCode::BAD_GATEWAY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<ServerError> for loan_advisor_core::Error {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::CustomerNotFound(phone) => loan_advisor_core::Error::CustomerNotFound(phone),
            ServerError::ConversationNotFound(phone) => {
                loan_advisor_core::Error::ConversationNotFound(phone)
            }
            ServerError::Telephony(e) => e.into(),
            other => loan_advisor_core::Error::Internal(other.to_string()),
        }
    }
}
