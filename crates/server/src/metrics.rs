//! Prometheus metrics

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Install the global Prometheus recorder
///
/// Returns `None` if a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            describe_metrics();
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

fn describe_metrics() {
    metrics::describe_counter!("loan_advisor_calls_total", "Calls registered and ended");
    metrics::describe_counter!(
        "loan_advisor_outbound_calls_total",
        "Outbound dial attempts by result"
    );
    metrics::describe_counter!("loan_advisor_turns_total", "Customer turns by outcome");
    metrics::describe_counter!("loan_advisor_tool_invocations_total", "Tool executions by tool and outcome");
    metrics::describe_histogram!(
        "loan_advisor_orchestrator_latency_seconds",
        metrics::Unit::Seconds,
        "Time to produce one spoken reply"
    );
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
