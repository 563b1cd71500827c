//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::{
    state::AppState,
    tasks::Visibility,
};
use super::responses::{
    ApiResponse, DisplayResponse, DraftResponse, HealthResponse, StatusResponse, StopResponse,
    TimerView,
};

fn record(state: &AppState, action: &str) {
    if let Err(e) = state.record_action(action) {
        warn!("Failed to record action {}: {}", action, e);
    }
}

/// Handle POST /timer/toggle - Start or pause the timer
pub async fn toggle_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    let next = state.timer.toggle();
    record(&state, "toggle");
    info!("Toggle endpoint called - timer {}", if next.running { "running" } else { "paused" });

    let message = if next.running { "Timer started" } else { "Timer paused" };
    Json(ApiResponse::new(message.to_string(), TimerView::of(&state.timer)))
}

/// Handle POST /timer/reset - Zero the elapsed time
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    state.timer.reset();
    record(&state, "reset");
    info!("Reset endpoint called");

    Json(ApiResponse::new("Timer reset".to_string(), TimerView::of(&state.timer)))
}

/// Handle POST /timer/stop - Stop the timer and pre-fill the study draft
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> Result<Json<StopResponse>, StatusCode> {
    let report = state.timer.stop();
    record(&state, "stop");

    if let Err(e) = state.set_draft(report.clone()) {
        error!("Failed to store study draft: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok(Json(StopResponse::new(TimerView::of(&state.timer), report)))
}

/// Handle POST /timer/sync - Re-save and re-broadcast the current state
pub async fn sync_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    state.timer.sync_now();
    record(&state, "sync");

    Json(ApiResponse::new("Timer state re-synced".to_string(), TimerView::of(&state.timer)))
}

/// Handle GET /timer/status - Return the timer and host status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        timer: TimerView::of(&state.timer),
        state: state.timer.snapshot(),
        context: state.timer.id(),
        sync_connected: state.timer.is_connected(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /study/draft - Return the study draft left by the last stop
pub async fn draft_handler(State(state): State<Arc<AppState>>) -> Result<Json<DraftResponse>, StatusCode> {
    match state.get_draft() {
        Ok(draft) => Ok(Json(DraftResponse { draft })),
        Err(e) => {
            error!("Failed to read study draft: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /display - Return the latest display frame
pub async fn display_handler(State(state): State<Arc<AppState>>) -> Json<DisplayResponse> {
    Json(DisplayResponse {
        visibility: state.visibility(),
        frame: state.current_frame(),
    })
}

/// Handle POST /display/visible - The timer view is back on screen
pub async fn display_visible_handler(State(state): State<Arc<AppState>>) -> Json<DisplayResponse> {
    state.set_visibility(Visibility::Visible);
    record(&state, "display-visible");

    // The loop refreshes on its own; answer with a fresh reading meanwhile
    Json(DisplayResponse {
        visibility: Visibility::Visible,
        frame: crate::tasks::DisplayFrame::capture(&state.timer),
    })
}

/// Handle POST /display/hidden - The timer view was minimized or closed
pub async fn display_hidden_handler(State(state): State<Arc<AppState>>) -> Json<DisplayResponse> {
    state.set_visibility(Visibility::Hidden);
    record(&state, "display-hidden");

    Json(DisplayResponse {
        visibility: Visibility::Hidden,
        frame: state.current_frame(),
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
