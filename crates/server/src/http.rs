//! HTTP Endpoints
//!
//! Voice webhooks plus a small REST API for operators.

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use loan_advisor_core::{
    ConversationState, ConversationStep, CustomerDirectory, Speaker, VerificationStatus,
};

use crate::calls::CallSession;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::voice::voice_routes;
use crate::ServerError;

/// Readiness checks give up on the LLM after this long
const READY_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    // Outer backstop; /voice/process applies its own advisor timeout first
    let timeout = Duration::from_secs(server.timeout_seconds.saturating_mul(2).max(1));

    Router::new()
        .merge(voice_routes(&state))
        // Calls
        .route("/api/calls", get(list_calls).post(place_call))
        .route("/api/calls/:sid", get(get_call))
        // Conversations
        .route("/api/conversations/:phone", get(get_conversation))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        // Middleware
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns a permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000
/// - Otherwise, uses the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:3000"))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Outbound call request
#[derive(Debug, Deserialize)]
struct PlaceCallRequest {
    phone: String,
}

#[derive(Debug, Serialize)]
struct PlaceCallResponse {
    call_sid: String,
    phone: String,
    customer_name: String,
}

/// POST /api/calls
async fn place_call(
    State(state): State<AppState>,
    Json(request): Json<PlaceCallRequest>,
) -> Result<(StatusCode, Json<PlaceCallResponse>), ServerError> {
    let phone = request.phone.trim().to_string();
    if phone.is_empty() {
        return Err(ServerError::InvalidRequest("phone is required".to_string()));
    }

    let customer = state
        .advisor
        .directory()
        .get(&phone)
        .ok_or_else(|| ServerError::CustomerNotFound(phone.clone()))?;

    let dialer = state.dialer.as_ref().ok_or_else(|| {
        ServerError::TelephonyUnavailable("Twilio credentials are not configured".to_string())
    })?;

    let call_sid = match dialer.place_call(&phone).await {
        Ok(sid) => {
            metrics::counter!("loan_advisor_outbound_calls_total", "result" => "ok").increment(1);
            sid
        }
        Err(e) => {
            metrics::counter!("loan_advisor_outbound_calls_total", "result" => "error").increment(1);
            return Err(e.into());
        }
    };

    tracing::info!(call_sid = %call_sid, phone = %phone, customer = %customer.full_name, "Outbound call placed");

    Ok((
        StatusCode::CREATED,
        Json(PlaceCallResponse {
            call_sid,
            phone,
            customer_name: customer.full_name,
        }),
    ))
}

/// GET /api/calls
async fn list_calls(State(state): State<AppState>) -> Json<serde_json::Value> {
    let calls = state.calls.list();
    Json(serde_json::json!({
        "calls": calls,
        "count": calls.len(),
    }))
}

/// GET /api/calls/:sid
async fn get_call(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Json<CallSession>, ServerError> {
    state
        .calls
        .get(&sid)
        .map(Json)
        .ok_or(ServerError::CallNotFound(sid))
}

#[derive(Debug, Serialize)]
struct MessageView {
    role: Speaker,
    content: String,
    step: Option<ConversationStep>,
}

/// Conversation without the customer's verification data
#[derive(Debug, Serialize)]
struct ConversationView {
    customer_phone: String,
    customer_name: Option<String>,
    verification_status: VerificationStatus,
    current_step: ConversationStep,
    escalation_needed: bool,
    conversation_complete: bool,
    context_summary: String,
    history: Vec<MessageView>,
}

impl From<ConversationState> for ConversationView {
    fn from(state: ConversationState) -> Self {
        Self {
            customer_phone: state.customer_phone,
            customer_name: state.customer.map(|c| c.full_name),
            verification_status: state.verification_status,
            current_step: state.current_step,
            escalation_needed: state.escalation_needed,
            conversation_complete: state.conversation_complete,
            context_summary: state.context_summary,
            history: state
                .history
                .into_iter()
                .map(|m| MessageView {
                    role: m.role,
                    content: m.content,
                    step: m.step,
                })
                .collect(),
        }
    }
}

/// GET /api/conversations/:phone
async fn get_conversation(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let conversation = state
        .advisor
        .conversation(&phone)
        .ok_or(ServerError::ConversationNotFound(phone))?;

    Ok(Json(ConversationView::from(conversation)))
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let llm_ready = tokio::time::timeout(READY_CHECK_TIMEOUT, state.llm.is_available())
        .await
        .unwrap_or(false);
    let telephony_ready = state.dialer.is_some();

    // Inbound webhooks still work without a dialer
    let status = if llm_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if llm_ready { "ready" } else { "not_ready" },
            "checks": {
                "llm": { "ready": llm_ready, "model": state.llm.model_name() },
                "telephony": { "ready": telephony_ready },
            },
            "active_calls": state.calls.count(),
            "active_conversations": state.advisor.active_conversations(),
        })),
    )
}
