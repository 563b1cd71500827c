//! Host application state shared by the HTTP handlers

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info};

use super::{SharedTimer, StopReport};
use crate::tasks::{DisplayFrame, Visibility};

/// Channel ends the display loop needs; the host keeps the other ends
#[derive(Debug)]
pub struct DisplayLink {
    pub visibility_rx: watch::Receiver<Visibility>,
    pub frames_tx: watch::Sender<DisplayFrame>,
}

/// Everything the host page's endpoints touch
#[derive(Debug)]
pub struct AppState {
    /// This host's timer context
    pub timer: Arc<SharedTimer>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Study log entry pre-filled by the last stop
    pub draft: Arc<Mutex<Option<StopReport>>>,
    /// Display visibility, read by the display loop
    pub visibility_tx: watch::Sender<Visibility>,
    /// Latest frame produced by the display loop
    pub frames_rx: watch::Receiver<DisplayFrame>,
}

impl AppState {
    /// Create the host state around `timer` with a visible display
    pub fn new(port: u16, host: String, timer: Arc<SharedTimer>) -> (Self, DisplayLink) {
        let (visibility_tx, visibility_rx) = watch::channel(Visibility::Visible);
        let (frames_tx, frames_rx) = watch::channel(DisplayFrame::capture(&timer));

        let state = Self {
            timer,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            draft: Arc::new(Mutex::new(None)),
            visibility_tx,
            frames_rx,
        };
        let link = DisplayLink {
            visibility_rx,
            frames_tx,
        };
        (state, link)
    }

    /// Remember the last action taken through the host
    pub fn record_action(&self, action: &str) -> Result<(), String> {
        let mut last_action = self.last_action.lock()
            .map_err(|e| format!("Failed to lock last action: {}", e))?;
        *last_action = Some(action.to_string());
        drop(last_action);

        let mut last_time = self.last_action_time.lock()
            .map_err(|e| format!("Failed to lock last action time: {}", e))?;
        *last_time = Some(Utc::now());

        debug!("Recorded action: {}", action);
        Ok(())
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    /// Store the study log draft produced by a stop
    pub fn set_draft(&self, report: StopReport) -> Result<(), String> {
        let mut draft = self.draft.lock()
            .map_err(|e| format!("Failed to lock study draft: {}", e))?;
        info!("Study draft ready: {} ({} min)", report.duration, report.duration_min);
        *draft = Some(report);
        Ok(())
    }

    /// Current study log draft, if the timer was stopped
    pub fn get_draft(&self) -> Result<Option<StopReport>, String> {
        self.draft.lock()
            .map(|draft| draft.clone())
            .map_err(|e| format!("Failed to lock study draft: {}", e))
    }

    /// Tell the display loop whether the timer is on screen
    pub fn set_visibility(&self, visibility: Visibility) {
        info!("Display is now {:?}", visibility);
        self.visibility_tx.send_replace(visibility);
    }

    pub fn visibility(&self) -> Visibility {
        *self.visibility_tx.borrow()
    }

    /// Latest frame the display loop produced
    pub fn current_frame(&self) -> DisplayFrame {
        self.frames_rx.borrow().clone()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
