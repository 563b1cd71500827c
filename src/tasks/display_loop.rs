//! Presentation loop refreshing the displayed time

use std::{sync::Arc, time::Duration};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::watch,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::state::SharedTimer;

/// Whether anyone is looking at the timer display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// What the display currently shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFrame {
    pub running: bool,
    pub elapsed_seconds: u64,
    /// `HH:MM:SS`
    pub formatted: String,
}

impl DisplayFrame {
    /// Read the timer without touching it
    pub fn capture(timer: &SharedTimer) -> Self {
        let state = timer.snapshot();
        let elapsed_seconds = state.elapsed_seconds(timer.now_ms());
        Self {
            running: state.running,
            elapsed_seconds,
            formatted: crate::state::format_hms(elapsed_seconds),
        }
    }
}

/// Keep `frames_tx` showing the current elapsed time.
///
/// Ticks every `tick` while the timer runs and the display is visible, emits
/// one frame per state change, and refreshes immediately when the display
/// becomes visible again. Returns once `visibility_rx` closes.
pub async fn display_loop_task(
    timer: Arc<SharedTimer>,
    tick: Duration,
    mut visibility_rx: watch::Receiver<Visibility>,
    frames_tx: watch::Sender<DisplayFrame>,
) {
    info!("Starting display loop (tick {:?})", tick);

    let mut state_rx = timer.watch();
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    frames_tx.send_replace(DisplayFrame::capture(&timer));

    loop {
        let visible = *visibility_rx.borrow_and_update() == Visibility::Visible;
        let ticking = visible && timer.running();

        tokio::select! {
            _ = ticker.tick(), if ticking => {
                frames_tx.send_replace(DisplayFrame::capture(&timer));
            }

            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if visible {
                    frames_tx.send_replace(DisplayFrame::capture(&timer));
                    ticker.reset();
                }
            }

            changed = visibility_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if *visibility_rx.borrow() == Visibility::Visible {
                    debug!("Display visible again, refreshing now");
                    frames_tx.send_replace(DisplayFrame::capture(&timer));
                    ticker.reset();
                } else {
                    debug!("Display hidden, refresh suspended");
                }
            }
        }
    }

    info!("Display loop stopped");
}
