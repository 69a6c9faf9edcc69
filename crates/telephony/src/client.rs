//! Twilio REST client

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use loan_advisor_config::TelephonyConfig;

use crate::TelephonyError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Status callback events requested for outbound calls
const STATUS_EVENTS: [&str; 4] = ["initiated", "ringing", "answered", "completed"];

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Something that can ring a customer
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Start a call to `to`, returning the provider's call id
    async fn place_call(&self, to: &str) -> Result<String, TelephonyError>;
}

/// Places outbound calls through the Twilio API
#[derive(Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    public_base_url: String,
}

impl TwilioClient {
    pub fn new(config: &TelephonyConfig) -> Result<Self, TelephonyError> {
        if config.account_sid.is_empty() || config.auth_token.is_empty() {
            return Err(TelephonyError::NotConfigured(
                "account_sid and auth_token are required".to_string(),
            ));
        }

        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.phone_number.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.api_base, self.account_sid
        )
    }

    /// Form body for a call to `to`
    fn call_params(&self, to: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("To", to.to_string()),
            ("From", self.from_number.clone()),
            ("Url", format!("{}/voice/start", self.public_base_url)),
            ("Method", "POST".to_string()),
            ("StatusCallback", format!("{}/voice/status", self.public_base_url)),
            ("StatusCallbackMethod", "POST".to_string()),
        ];
        for event in STATUS_EVENTS {
            params.push(("StatusCallbackEvent", event.to_string()));
        }
        params
    }
}

#[async_trait]
impl Dialer for TwilioClient {
    /// Dial `to`; the call's webhooks point at our public base URL
    ///
    /// Returns the call SID.
    async fn place_call(&self, to: &str) -> Result<String, TelephonyError> {
        tracing::info!(to = %to, from = %self.from_number, "Placing outbound call");

        let response = self
            .http
            .post(self.calls_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&self.call_params(to))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(body);
            tracing::error!(status = status.as_u16(), message = %message, "Twilio rejected call");
            return Err(TelephonyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let call: CallResource = response
            .json()
            .await
            .map_err(|e| TelephonyError::InvalidResponse(e.to_string()))?;

        tracing::info!(call_sid = %call.sid, to = %to, "Outbound call initiated");
        Ok(call.sid)
    }
}
