//! HTTP Endpoints
//!
//! REST API over the intent resolver.

use axum::{
    extract::{Json, Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use fleet_assistant_agent::{CacheStats, RuleUpdate, StatusReport};
use fleet_assistant_core::{Intent, InteractionId, KeyboardButton, Resolution};

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/api/messages", post(resolve_message))
        .route("/api/feedback", post(submit_feedback))
        .route("/api/status", get(status))
        .route("/api/cache/stats", get(cache_stats))
        .route("/api/rules/:intent", post(update_rules))
        // Health check
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler));

    let router = if state.config.server.cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Message request
#[derive(Debug, Deserialize)]
struct MessageRequest {
    message: String,
}

/// Resolution plus the concrete keyboard rows for the transport
#[derive(Debug, Serialize)]
struct MessageResponse {
    #[serde(flatten)]
    resolution: Resolution,
    buttons: Vec<Vec<KeyboardButton>>,
}

/// POST /api/messages
async fn resolve_message(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    if request.message.trim().is_empty() {
        return Err(ServerError::InvalidRequest("message is empty".to_string()));
    }

    let resolution = state.resolver.resolve(&request.message).await;
    let buttons = resolution.keyboard.rows();

    Ok(Json(MessageResponse { resolution, buttons }))
}

/// Feedback request
#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    interaction_id: InteractionId,
    helpful: bool,
}

/// POST /api/feedback
async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<StatusCode, ServerError> {
    if state.resolver.feedback(request.interaction_id, request.helpful) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound(format!(
            "interaction {}",
            request.interaction_id
        )))
    }
}

/// GET /api/status
async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.resolver.status_report())
}

/// GET /api/cache/stats
async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.resolver.cache().stats())
}

/// POST /api/rules/:intent
async fn update_rules(
    State(state): State<AppState>,
    Path(intent): Path<String>,
    Json(update): Json<RuleUpdate>,
) -> Result<StatusCode, ServerError> {
    let intent: Intent = intent
        .parse()
        .map_err(|e: fleet_assistant_core::ParseIntentError| ServerError::InvalidRequest(e.to_string()))?;

    state.resolver.update_rules(intent, &update)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
