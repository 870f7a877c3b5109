//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use tracing::{error, info};

use crate::engine::Intent;
use crate::state::AppState;

use super::responses::{ApiResponse, DurationRequest, HealthResponse, StatusResponse};

/// Shared body of the four intent endpoints.
async fn intent_response(
    state: Arc<AppState>,
    intent: Intent,
    message: &str,
) -> Result<Json<ApiResponse>, StatusCode> {
    match state.send_intent(intent).await {
        Ok(()) => Ok(Json(ApiResponse::accepted(
            message.to_string(),
            state.snapshot(),
        ))),
        Err(e) => {
            error!("Failed to submit {} intent: {}", intent.as_str(), e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /start - Begin a session from the configured duration
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    intent_response(state, Intent::Start, "Start intent submitted").await
}

/// Handle POST /pause - Freeze the running countdown
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    intent_response(state, Intent::Pause, "Pause intent submitted").await
}

/// Handle POST /resume - Continue from the frozen remaining time
pub async fn resume_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    intent_response(state, Intent::Resume, "Resume intent submitted").await
}

/// Handle POST /reset - Return to pristine at the configured duration
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    intent_response(state, Intent::Reset, "Reset intent submitted").await
}

/// Handle POST /duration - Edit the configured session length
///
/// Invalid input is rejected with 422 and leaves the model untouched; a
/// valid edit takes effect immediately in pristine and at the next reset
/// otherwise.
pub async fn duration_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DurationRequest>,
) -> Result<Json<ApiResponse>, (StatusCode, Json<ApiResponse>)> {
    match state.set_duration(request.minutes, request.seconds).await {
        Ok(setting) => {
            info!(
                "Duration endpoint called - {}m {}s accepted",
                setting.minutes(),
                setting.seconds()
            );
            Ok(Json(ApiResponse::accepted(
                format!("Duration set to {}m {}s", setting.minutes(), setting.seconds()),
                state.snapshot(),
            )))
        }
        Err(e) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::rejected(e.to_string(), state.snapshot())),
        )),
    }
}

/// Handle GET /status - Return the timer snapshot and server metadata
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let duration = match state.duration() {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to read duration: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer: state.snapshot(),
        duration,
        clock: state.clock_strategy,
        errors: state.get_errors(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
