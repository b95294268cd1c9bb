//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use fleet_assistant_agent::IntentResolver;
use fleet_assistant_config::Settings;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub resolver: Arc<IntentResolver>,
    /// Prometheus render handle, absent when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Settings, resolver: IntentResolver) -> Self {
        Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
