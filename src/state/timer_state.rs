//! Timer state structure and the pure operations over it
//!
//! Nothing in this module performs I/O or reads a clock: every operation takes
//! the current wall-clock instant (`now`, milliseconds since the epoch) as an
//! argument and returns a new state.

use serde::{Deserialize, Serialize};

/// Persisted stopwatch state shared by every context
///
/// Elapsed time is never stored; it is always derived from the anchor
/// timestamp and the accumulated base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Milliseconds accumulated by all completed runs
    pub base_elapsed_ms: u64,
    /// Wall-clock instant the current run began, `None` while paused
    pub start_ms: Option<i64>,
    pub running: bool,
}

impl TimerState {
    /// Create a new paused timer at zero
    pub fn new() -> Self {
        Self {
            base_elapsed_ms: 0,
            start_ms: None,
            running: false,
        }
    }

    /// `running` and `start_ms` must agree
    pub fn is_consistent(&self) -> bool {
        self.running == self.start_ms.is_some()
    }

    /// Length of the current run, clamped at zero if the clock went backwards
    fn run_ms(&self, now: i64) -> u64 {
        match (self.running, self.start_ms) {
            (true, Some(start)) => now.saturating_sub(start).max(0) as u64,
            _ => 0,
        }
    }

    /// Total elapsed milliseconds at `now`. Never less than the accumulated base.
    pub fn elapsed(&self, now: i64) -> u64 {
        self.base_elapsed_ms.saturating_add(self.run_ms(now))
    }

    /// Whole elapsed seconds at `now`
    pub fn elapsed_seconds(&self, now: i64) -> u64 {
        self.elapsed(now) / 1000
    }

    /// Fold the current run into the base and pause
    fn consolidate(&self, now: i64) -> Self {
        Self {
            base_elapsed_ms: self.elapsed(now),
            start_ms: None,
            running: false,
        }
    }

    /// Pause when running, start a new run otherwise
    pub fn toggle(&self, now: i64) -> Self {
        if self.running {
            self.consolidate(now)
        } else {
            Self {
                base_elapsed_ms: self.base_elapsed_ms,
                start_ms: Some(now),
                running: true,
            }
        }
    }

    /// Zero the accumulated time. A running timer keeps running from `now`.
    pub fn reset(&self, now: i64) -> Self {
        Self {
            base_elapsed_ms: 0,
            start_ms: self.running.then_some(now),
            running: self.running,
        }
    }

    /// Pause (if needed) and report the total in whole seconds
    pub fn stop(&self, now: i64) -> (Self, u64) {
        let stopped = self.consolidate(now);
        let total_seconds = stopped.base_elapsed_ms / 1000;
        (stopped, total_seconds)
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Format whole seconds as `HH:MM:SS`. Hours grow past two digits instead of wrapping.
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Convert an `HH:MM:SS` duration to whole minutes for the study log.
///
/// Missing fields count as zero and leftover seconds are truncated; anything
/// that does not parse yields zero.
pub fn hms_to_minutes(hms: &str) -> u64 {
    let mut fields = hms.trim().split(':').map(str::trim);
    let mut next = || -> Option<u64> {
        match fields.next() {
            None | Some("") => Some(0),
            Some(field) => field.parse().ok(),
        }
    };

    match (next(), next(), next()) {
        (Some(h), Some(m), Some(s)) => h
            .saturating_mul(60)
            .saturating_add(m)
            .saturating_add(s / 60),
        _ => 0,
    }
}
