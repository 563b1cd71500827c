//! HTTP API module
//!
//! This module contains the host page's endpoints and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer/toggle", post(toggle_handler))
        .route("/timer/reset", post(reset_handler))
        .route("/timer/stop", post(stop_handler))
        .route("/timer/sync", post(sync_handler))
        .route("/timer/status", get(status_handler))
        .route("/study/draft", get(draft_handler))
        .route("/display", get(display_handler))
        .route("/display/visible", post(display_visible_handler))
        .route("/display/hidden", post(display_hidden_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
