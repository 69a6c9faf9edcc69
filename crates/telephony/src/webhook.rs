//! Twilio webhook payloads
//!
//! Twilio posts `application/x-www-form-urlencoded` bodies with
//! PascalCase keys. Only the fields the voice flow reads are modelled;
//! the rest are ignored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Call status as reported by Twilio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    Initiated,
    Ringing,
    InProgress,
    Completed,
    Busy,
    NoAnswer,
    Failed,
    Canceled,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Queued => "queued",
            CallStatus::Initiated => "initiated",
            CallStatus::Ringing => "ringing",
            CallStatus::InProgress => "in-progress",
            CallStatus::Completed => "completed",
            CallStatus::Busy => "busy",
            CallStatus::NoAnswer => "no-answer",
            CallStatus::Failed => "failed",
            CallStatus::Canceled => "canceled",
        }
    }

    /// The call is over and its state can be dropped
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Completed
                | CallStatus::Busy
                | CallStatus::NoAnswer
                | CallStatus::Failed
                | CallStatus::Canceled
        )
    }
}

impl FromStr for CallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(CallStatus::Queued),
            "initiated" => Ok(CallStatus::Initiated),
            "ringing" => Ok(CallStatus::Ringing),
            "in-progress" | "answered" => Ok(CallStatus::InProgress),
            "completed" => Ok(CallStatus::Completed),
            "busy" => Ok(CallStatus::Busy),
            "no-answer" => Ok(CallStatus::NoAnswer),
            "failed" => Ok(CallStatus::Failed),
            "canceled" | "cancelled" => Ok(CallStatus::Canceled),
            other => Err(format!("unknown call status: {}", other)),
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Call connected (`/voice/start`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoiceWebhook {
    pub call_sid: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub call_status: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

impl VoiceWebhook {
    /// The customer's number: the callee on outbound calls, the caller otherwise
    pub fn customer_phone(&self) -> &str {
        match self.direction.as_deref() {
            Some(d) if d.starts_with("inbound") => &self.from,
            _ => &self.to,
        }
    }
}

/// Speech gathered (`/voice/process`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpeechWebhook {
    pub call_sid: String,
    #[serde(default)]
    pub speech_result: Option<String>,
    /// Sent as a decimal string; kept raw so a malformed value never rejects the turn
    #[serde(default)]
    pub confidence: Option<String>,
}

impl SpeechWebhook {
    /// Trimmed transcript, empty when nothing was heard
    pub fn transcript(&self) -> &str {
        self.speech_result.as_deref().unwrap_or("").trim()
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence.as_deref().and_then(|c| c.trim().parse().ok())
    }
}

/// Status callback (`/voice/status`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusCallback {
    pub call_sid: String,
    #[serde(default)]
    pub call_status: String,
    #[serde(default)]
    pub call_duration: Option<String>,
}

impl StatusCallback {
    pub fn status(&self) -> Option<CallStatus> {
        self.call_status.parse().ok()
    }

    pub fn duration_secs(&self) -> Option<u64> {
        self.call_duration.as_deref().and_then(|d| d.trim().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        for status in ["completed", "busy", "no-answer", "failed", "canceled"] {
            assert!(status.parse::<CallStatus>().unwrap().is_terminal(), "{}", status);
        }
        for status in ["queued", "initiated", "ringing", "in-progress"] {
            assert!(!status.parse::<CallStatus>().unwrap().is_terminal(), "{}", status);
        }
        assert!("weird".parse::<CallStatus>().is_err());
        assert_eq!(CallStatus::NoAnswer.to_string(), "no-answer");
    }

    #[test]
    fn test_customer_phone_by_direction() {
        let outbound = VoiceWebhook {
            call_sid: "CA1".into(),
            from: "+15550000000".into(),
            to: "+1234567891".into(),
            call_status: None,
            direction: Some("outbound-api".into()),
        };
        assert_eq!(outbound.customer_phone(), "+1234567891");

        let inbound = VoiceWebhook {
            direction: Some("inbound".into()),
            ..outbound.clone()
        };
        assert_eq!(inbound.customer_phone(), "+15550000000");

        let unknown = VoiceWebhook {
            direction: None,
            ..outbound
        };
        assert_eq!(unknown.customer_phone(), "+1234567891");
    }

    #[test]
    fn test_speech_accessors() {
        let speech = SpeechWebhook {
            call_sid: "CA1".into(),
            speech_result: Some("  yes this is Sarah ".into()),
            confidence: Some("0.92".into()),
        };
        assert_eq!(speech.transcript(), "yes this is Sarah");
        assert_eq!(speech.confidence(), Some(0.92));

        let silent = SpeechWebhook::default();
        assert_eq!(silent.transcript(), "");
        assert_eq!(silent.confidence(), None);
    }

    #[test]
    fn test_status_callback() {
        let cb = StatusCallback {
            call_sid: "CA1".into(),
            call_status: "completed".into(),
            call_duration: Some("42".into()),
        };
        assert_eq!(cb.status(), Some(CallStatus::Completed));
        assert_eq!(cb.duration_secs(), Some(42));
    }
}
