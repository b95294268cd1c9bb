//! Prometheus metrics
//!
//! The agent records through the `metrics` facade; this module installs the
//! Prometheus recorder and serves its rendering.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;
use crate::ServerError;

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("failed to install metrics recorder: {}", e)))?;
    describe_metrics();
    Ok(handle)
}

/// Register help text for the metrics the resolver emits
pub fn describe_metrics() {
    metrics::describe_counter!(
        "fleet_assistant_resolutions_total",
        "Resolved messages by intent"
    );
    metrics::describe_counter!(
        "fleet_assistant_cache_hits_total",
        "Response cache hits by kind (exact or similar)"
    );
    metrics::describe_counter!(
        "fleet_assistant_feedback_total",
        "Explicit feedback by helpfulness"
    );
    metrics::describe_histogram!(
        "fleet_assistant_resolution_duration_seconds",
        metrics::Unit::Seconds,
        "End-to-end resolution latency"
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
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
