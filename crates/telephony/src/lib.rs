//! Twilio voice integration
//!
//! Features:
//! - TwiML builder for `<Say>`, speech `<Gather>`, `<Redirect>`, `<Pause>` and `<Hangup>`
//! - Form-encoded webhook payloads and call status parsing
//! - REST client for placing outbound calls
//! - `X-Twilio-Signature` validation

pub mod client;
pub mod signature;
pub mod twiml;
pub mod webhook;

pub use client::{Dialer, TwilioClient};
pub use signature::{compute_signature, validate_signature, SIGNATURE_HEADER};
pub use twiml::TwimlBuilder;
pub use webhook::{CallStatus, SpeechWebhook, StatusCallback, VoiceWebhook};

use thiserror::Error;

/// Telephony errors
#[derive(Error, Debug)]
pub enum TelephonyError {
    #[error("Twilio not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid request signature")]
    InvalidSignature,

    #[error("Twilio API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<TelephonyError> for loan_advisor_core::Error {
    fn from(err: TelephonyError) -> Self {
        loan_advisor_core::Error::Telephony(err.to_string())
    }
}
