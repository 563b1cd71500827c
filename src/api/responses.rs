//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    state::{SharedTimer, StopReport, TimerState},
    tasks::{DisplayFrame, Visibility},
};

/// Timer values as the host page displays them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerView {
    pub running: bool,
    pub elapsed_seconds: u64,
    pub formatted: String,
}

impl TimerView {
    pub fn of(timer: &SharedTimer) -> Self {
        let frame = DisplayFrame::capture(timer);
        Self {
            running: frame.running,
            elapsed_seconds: frame.elapsed_seconds,
            formatted: frame.formatted,
        }
    }
}

/// API response structure for timer actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerView,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(message: String, timer: TimerView) -> Self {
        Self {
            status: if timer.running { "running" } else { "paused" }.to_string(),
            message,
            timestamp: Utc::now(),
            timer,
        }
    }
}

/// Response to a stop: the final timer plus the pre-filled study draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerView,
    pub draft: StopReport,
}

impl StopResponse {
    pub fn new(timer: TimerView, draft: StopReport) -> Self {
        Self {
            status: "stopped".to_string(),
            message: format!("Timer stopped at {}", draft.duration),
            timestamp: Utc::now(),
            timer,
            draft,
        }
    }
}

/// Full status of the host's timer context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timer: TimerView,
    pub state: TimerState,
    pub context: u64,
    pub sync_connected: bool,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Display loop output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayResponse {
    pub visibility: Visibility,
    pub frame: DisplayFrame,
}

/// Study log draft left by the last stop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftResponse {
    pub draft: Option<StopReport>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
