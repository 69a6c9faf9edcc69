//! Twilio voice webhooks
//!
//! `/voice/start` greets the customer, `/voice/process` handles each
//! gathered utterance and `/voice/status` cleans up finished calls. All
//! replies are TwiML except the status acknowledgement.

use axum::{
    body::Body,
    extract::{FromRequest, Request, State},
    http::{header, Method},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Form, Router,
};
use std::time::Duration;

use loan_advisor_telephony::{
    validate_signature, SpeechWebhook, StatusCallback, TwimlBuilder, VoiceWebhook,
    SIGNATURE_HEADER,
};

use crate::state::AppState;
use crate::ServerError;

const START_ERROR: &str =
    "I'm sorry, there was an error starting our conversation. Please try again later.";
const NO_INPUT: &str = "I didn't hear anything. Let me try again.";
const CALL_ERROR: &str = "I'm sorry, there was an error with your call.";
const GOODBYE: &str = "Thank you for your time. Goodbye!";
const MAX_TURNS: &str =
    "We've reached the maximum conversation time. Thank you for your time. Goodbye!";
const DIDNT_CATCH: &str = "I didn't catch that. Could you please repeat?";
const CLOSING: &str = "Thank you for your time. Have a great day!";
const STILL_THERE: &str = "Are you still there?";
const PROCESS_ERROR: &str =
    "I'm sorry, I had trouble processing your response. Could you please try again?";

const PROCESS_PATH: &str = "/voice/process";

/// Webhook bodies are a few hundred bytes
const MAX_WEBHOOK_BODY_BYTES: usize = 64 * 1024;

const GOODBYE_PHRASES: [&str; 6] = ["bye", "goodbye", "good bye", "end call", "hang up", "thanks bye"];

/// Whether the caller is saying goodbye
///
/// Phrases match whole words only, so "maybe" or "bypass" do not end the call.
pub fn is_goodbye(speech: &str) -> bool {
    let lowered = speech.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();

    GOODBYE_PHRASES.iter().any(|phrase| {
        let target: Vec<&str> = phrase.split(' ').collect();
        words.windows(target.len()).any(|window| window == target.as_slice())
    })
}

fn twiml(builder: TwimlBuilder) -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], builder.build()).into_response()
}

fn say(builder: TwimlBuilder, state: &AppState, text: &str) -> TwimlBuilder {
    let telephony = &state.config.telephony;
    builder.say(text, &telephony.voice, &telephony.language)
}

fn gather(builder: TwimlBuilder, state: &AppState) -> TwimlBuilder {
    builder.gather_speech(
        &state.webhook_url(PROCESS_PATH),
        state.config.telephony.gather_timeout_secs,
        None,
        None,
    )
}

/// POST /voice/start
pub async fn voice_start(
    State(state): State<AppState>,
    Form(hook): Form<VoiceWebhook>,
) -> Response {
    let phone = hook.customer_phone().trim().to_string();
    tracing::info!(call_sid = %hook.call_sid, phone = %phone, direction = ?hook.direction, "Call connected");

    if hook.call_sid.trim().is_empty() || phone.is_empty() {
        tracing::warn!("Voice start without call SID or customer number");
        return twiml(say(TwimlBuilder::new(), &state, START_ERROR).hangup());
    }

    state.calls.start_call(&hook.call_sid, &phone);
    let message = state.advisor.start_conversation(&phone);

    if !state.advisor.has_customer(&phone) {
        state.calls.end_call(&hook.call_sid);
        return twiml(say(TwimlBuilder::new(), &state, &message).hangup());
    }

    state.calls.mark_conversation_started(&hook.call_sid);

    let builder = say(TwimlBuilder::new(), &state, &message);
    let builder = say(gather(builder, &state), &state, NO_INPUT);
    twiml(builder.redirect(&state.webhook_url(PROCESS_PATH)))
}

/// POST /voice/process
pub async fn voice_process(
    State(state): State<AppState>,
    Form(hook): Form<SpeechWebhook>,
) -> Response {
    let call_sid = hook.call_sid.as_str();
    let speech = hook.transcript();
    tracing::info!(call_sid = %call_sid, speech = %speech, confidence = ?hook.confidence(), "Caller spoke");

    if state.calls.get(call_sid).is_none() {
        tracing::warn!(call_sid = %call_sid, "Speech for unknown call");
        return twiml(say(TwimlBuilder::new(), &state, CALL_ERROR).hangup());
    }

    if is_goodbye(speech) {
        state.calls.end_call(call_sid);
        return twiml(say(TwimlBuilder::new(), &state, GOODBYE).hangup());
    }

    let call = match state.calls.record_turn(call_sid) {
        Some(call) => call,
        None => return twiml(say(TwimlBuilder::new(), &state, CALL_ERROR).hangup()),
    };

    if call.turns_exhausted() {
        tracing::info!(call_sid = %call_sid, turns = call.turn_count, "Turn limit reached");
        state.calls.end_call(call_sid);
        return twiml(say(TwimlBuilder::new(), &state, MAX_TURNS).hangup());
    }

    if speech.is_empty() {
        return twiml(gather(say(TwimlBuilder::new(), &state, DIDNT_CATCH), &state));
    }

    // The turn runs on its own task so tool outcomes still land on the
    // conversation when the caller has already been answered.
    let timeout = Duration::from_secs(state.config.server.timeout_seconds);
    let advisor = state.advisor.clone();
    let phone = call.customer_phone.clone();
    let text = speech.to_string();
    let turn = tokio::spawn(async move { advisor.continue_conversation(&phone, &text).await });

    let reply = match tokio::time::timeout(timeout, turn).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            tracing::error!(call_sid = %call_sid, error = %e, "Advisor turn aborted");
            return twiml(gather(say(TwimlBuilder::new(), &state, PROCESS_ERROR), &state));
        }
        Err(_) => {
            tracing::error!(call_sid = %call_sid, timeout_secs = timeout.as_secs(), "Advisor timed out");
            return twiml(gather(say(TwimlBuilder::new(), &state, PROCESS_ERROR), &state));
        }
    };
    state.calls.touch(call_sid);

    let builder = say(TwimlBuilder::new(), &state, &reply);

    if state.advisor.is_finished(&call.customer_phone) {
        state.calls.end_call(call_sid);
        return twiml(say(builder, &state, CLOSING).hangup());
    }

    let builder = say(gather(builder, &state), &state, STILL_THERE);
    twiml(builder.redirect(&state.webhook_url(PROCESS_PATH)))
}

/// POST /voice/status
pub async fn voice_status(
    State(state): State<AppState>,
    Form(callback): Form<StatusCallback>,
) -> Response {
    tracing::info!(
        call_sid = %callback.call_sid,
        status = %callback.call_status,
        duration_secs = ?callback.duration_secs(),
        "Call status update"
    );

    if callback.status().map(|s| s.is_terminal()).unwrap_or(false) {
        state.calls.end_call(&callback.call_sid);
    }

    ([(header::CONTENT_TYPE, "text/plain")], "OK").into_response()
}

/// Reject webhooks whose `X-Twilio-Signature` does not match
pub async fn verify_twilio_signature(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let (parts, body) = req.into_parts();

    let signature = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or(ServerError::InvalidSignature)?;

    let bytes = axum::body::to_bytes(body, MAX_WEBHOOK_BODY_BYTES)
        .await
        .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

    let parse_request = Request::builder()
        .method(Method::POST)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(bytes.clone()))
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    let Form(params) = Form::<Vec<(String, String)>>::from_request(parse_request, &())
        .await
        .map_err(|_| ServerError::InvalidRequest("malformed form body".to_string()))?;

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| parts.uri.path());
    let url = state.webhook_url(path);

    let valid = validate_signature(
        &state.config.telephony.auth_token,
        &url,
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        &signature,
    );
    if !valid {
        tracing::warn!(url = %url, "Rejected webhook with bad signature");
        return Err(ServerError::InvalidSignature);
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Webhook routes, signed when `telephony.validate_signatures` is set
pub fn voice_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/voice/start", post(voice_start))
        .route("/voice/process", post(voice_process))
        .route("/voice/status", post(voice_status));

    if state.config.telephony.validate_signatures {
        router.route_layer(middleware::from_fn_with_state(
            state.clone(),
            verify_twilio_signature,
        ))
    } else {
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_settings, test_state, test_state_with, CannedLlm};
    use axum::http::StatusCode;
    use async_trait::async_trait;
    use loan_advisor_core::{GenerateRequest, GenerateResponse, LanguageModel, ToolCall, ToolDefinition};
    use std::sync::Arc;
    use loan_advisor_telephony::compute_signature;
    use serde_json::json;
    use loan_advisor_telephony::twiml::xml_escape;
    use tower::ServiceExt;

    fn spoken(text: &str) -> String {
        xml_escape(text)
    }

    fn form(uri: &str, body: &str) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(state: &AppState, req: Request) -> (StatusCode, String) {
        let app = voice_routes(state).with_state(state.clone());
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn start(state: &AppState, sid: &str, to: &str) -> String {
        let body = format!("CallSid={}&From=%2B15550001111&To={}&Direction=outbound-api", sid, to.replace('+', "%2B"));
        send(state, form("/voice/start", &body)).await.1
    }

    async fn speak(state: &AppState, sid: &str, speech: &str) -> String {
        let body = format!("CallSid={}&SpeechResult={}&Confidence=0.9", sid, speech.replace(' ', "+"));
        send(state, form("/voice/process", &body)).await.1
    }

    #[test]
    fn test_goodbye_word_boundaries() {
        for phrase in ["Bye!", "okay goodbye", "good bye then", "please end call", "I'll hang up", "thanks, bye", "bye-bye"] {
            assert!(is_goodbye(phrase), "{}", phrase);
        }
        for phrase in ["maybe later", "bypass that", "my husband", "the goodbyes were long", "hang on", ""] {
            assert!(!is_goodbye(phrase), "{}", phrase);
        }
    }

    #[tokio::test]
    async fn test_start_known_customer() {
        let state = test_state();
        let xml = start(&state, "CA1", "+1234567891").await;

        assert!(xml.contains("Are we speaking with Sarah Johnson?"));
        assert!(xml.contains("action=\"https://abc.ngrok.io/voice/process\""));
        assert!(xml.contains("timeout=\"10\" speechTimeout=\"auto\""));
        assert!(xml.contains(&spoken(NO_INPUT)));
        assert!(xml.contains("<Redirect method=\"POST\">https://abc.ngrok.io/voice/process</Redirect>"));
        assert!(!xml.contains("<Hangup/>"));

        let call = state.calls.get("CA1").unwrap();
        assert!(call.conversation_started);
        assert_eq!(call.customer_phone, "+1234567891");
    }

    #[tokio::test]
    async fn test_start_unknown_customer_hangs_up() {
        let state = test_state();
        let xml = start(&state, "CA2", "+19998887777").await;
        assert!(xml.contains("couldn&apos;t find a customer record for the phone number +19998887777"));
        assert!(xml.contains("<Hangup/>"));
        assert!(state.calls.get("CA2").is_none());
    }

    #[tokio::test]
    async fn test_start_without_sid() {
        let state = test_state();
        let (_, xml) = send(&state, form("/voice/start", "CallSid=&To=%2B1234567891")).await;
        assert!(xml.contains(&spoken(START_ERROR)));
        assert!(xml.contains("<Hangup/>"));
    }

    #[tokio::test]
    async fn test_process_unknown_call() {
        let state = test_state();
        let xml = speak(&state, "CA404", "hello").await;
        assert!(xml.contains(&spoken(CALL_ERROR)));
        assert!(xml.contains("<Hangup/>"));
    }

    #[tokio::test]
    async fn test_process_turn() {
        let state = test_state();
        start(&state, "CA1", "+1234567891").await;

        let xml = speak(&state, "CA1", "yes this is Sarah").await;
        assert!(xml.contains("Your next EMI is due on July 20."));
        assert!(xml.contains(&spoken(STILL_THERE)));
        assert!(xml.contains("<Gather"));
        assert_eq!(state.calls.get("CA1").unwrap().turn_count, 1);
    }

    #[tokio::test]
    async fn test_process_goodbye() {
        let state = test_state();
        start(&state, "CA1", "+1234567891").await;

        let xml = speak(&state, "CA1", "ok goodbye").await;
        assert!(xml.contains(&spoken(GOODBYE)));
        assert!(xml.contains("<Hangup/>"));
        assert!(state.calls.get("CA1").is_none());
        assert!(state.advisor.conversation("+1234567891").is_none());
    }

    #[tokio::test]
    async fn test_process_empty_speech() {
        let state = test_state();
        start(&state, "CA1", "+1234567891").await;

        let (_, xml) = send(&state, form("/voice/process", "CallSid=CA1")).await;
        assert!(xml.contains(&spoken(DIDNT_CATCH)));
        assert!(xml.contains("<Gather"));
        assert!(!xml.contains("<Redirect"));
        assert_eq!(state.calls.get("CA1").unwrap().turn_count, 1);
    }

    #[tokio::test]
    async fn test_process_turn_limit() {
        let mut settings = test_settings();
        settings.telephony.max_turns = 2;
        let state = test_state_with(settings, CannedLlm::new(Vec::new()));
        start(&state, "CA1", "+1234567891").await;

        speak(&state, "CA1", "hello").await;
        let xml = speak(&state, "CA1", "hello again").await;
        assert!(xml.contains(&spoken(MAX_TURNS)));
        assert!(xml.contains("<Hangup/>"));
        assert!(state.calls.get("CA1").is_none());
    }

    #[tokio::test]
    async fn test_process_end_call_hangs_up() {
        let llm = CannedLlm::new(vec![
            GenerateResponse::tool_calls(vec![ToolCall::new("c1", "end_call", json!({"reason": "done"}))]),
            GenerateResponse::text("Glad I could help."),
        ]);
        let state = test_state_with(test_settings(), llm);
        start(&state, "CA1", "+1234567891").await;

        let xml = speak(&state, "CA1", "that is all").await;
        assert!(xml.contains("Glad I could help."));
        assert!(xml.contains(&spoken(CLOSING)));
        assert!(xml.contains("<Hangup/>"));
        assert!(state.calls.get("CA1").is_none());
    }

    /// Model that never answers
    struct StalledLlm;

    #[async_trait]
    impl LanguageModel for StalledLlm {
        async fn generate(&self, _request: GenerateRequest) -> loan_advisor_core::Result<GenerateResponse> {
            std::future::pending().await
        }

        async fn generate_with_tools(
            &self,
            _request: GenerateRequest,
            _tools: &[ToolDefinition],
        ) -> loan_advisor_core::Result<GenerateResponse> {
            std::future::pending().await
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_advisor_timeout() {
        let state = test_state_with(test_settings(), Arc::new(StalledLlm));
        start(&state, "CA1", "+1234567891").await;

        let xml = speak(&state, "CA1", "yes this is Sarah").await;
        assert!(xml.contains(&spoken(PROCESS_ERROR)));
        assert!(xml.contains("<Gather"));
        assert!(!xml.contains("<Hangup/>"));

        let call = state.calls.get("CA1").unwrap();
        assert_eq!(call.turn_count, 1);
        let conversation = state.advisor.conversation("+1234567891").unwrap();
        assert_eq!(conversation.user_response, "yes this is Sarah");
    }

    #[tokio::test]
    async fn test_status_terminal_ends_call() {
        let state = test_state();
        start(&state, "CA1", "+1234567891").await;

        let (status, body) = send(&state, form("/voice/status", "CallSid=CA1&CallStatus=ringing")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
        assert!(state.calls.get("CA1").is_some());

        send(&state, form("/voice/status", "CallSid=CA1&CallStatus=no-answer&CallDuration=0")).await;
        assert!(state.calls.get("CA1").is_none());
    }

    #[tokio::test]
    async fn test_signature_required_when_enabled() {
        let mut settings = test_settings();
        settings.telephony.validate_signatures = true;
        let state = test_state_with(settings, CannedLlm::new(Vec::new()));

        let (status, _) = send(&state, form("/voice/status", "CallSid=CA1&CallStatus=completed")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let signature = compute_signature(
            "test-token",
            "https://abc.ngrok.io/voice/status",
            [("CallSid", "CA1"), ("CallStatus", "completed")],
        );
        let mut req = form("/voice/status", "CallSid=CA1&CallStatus=completed");
        req.headers_mut().insert(SIGNATURE_HEADER, signature.parse().unwrap());
        let (status, body) = send(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");

        let mut req = form("/voice/status", "CallSid=CA1&CallStatus=completed");
        req.headers_mut().insert(SIGNATURE_HEADER, "bm9wZQ==".parse().unwrap());
        let (status, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
