//! Durable storage for the timer state
//!
//! Persistence is best-effort. A store that cannot be read looks empty and a
//! store that cannot be written is logged and ignored; the in-memory state of
//! the running context stays authoritative either way.

pub mod file;
pub mod memory;

use serde_json::Value;
use thiserror::Error;

use crate::state::TimerState;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Default name of the stored state document
pub const STORAGE_KEY: &str = "study_timer_state_v1";

/// Repository for the single shared timer record
pub trait TimerStore: Send + Sync {
    /// Stored state, or `None` when nothing valid is stored
    fn load(&self) -> Option<TimerState>;

    /// Store `state`, swallowing failures
    fn save(&self, state: &TimerState);
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored timer state is corrupt: {0}")]
    Corrupt(String),
}

/// Any finite JSON number, floored to whole milliseconds
fn whole_ms(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite()).map(f64::floor)
}

/// Decode a stored document, checking its shape before trusting it
pub fn decode_state(raw: &str) -> Result<TimerState, StoreError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;

    let base_elapsed_ms = value
        .get("baseElapsedMs")
        .and_then(whole_ms)
        .filter(|ms| *ms >= 0.0)
        .map(|ms| ms as u64);
    let start_ms = match value.get("startMs") {
        Some(Value::Null) => Some(None),
        Some(start) => whole_ms(start).map(|ms| Some(ms as i64)),
        None => None,
    };
    let running = value.get("running").and_then(Value::as_bool);

    let (Some(base_elapsed_ms), Some(start_ms), Some(running)) = (base_elapsed_ms, start_ms, running)
    else {
        return Err(StoreError::Corrupt(format!("unexpected shape: {}", value)));
    };

    let state = TimerState {
        base_elapsed_ms,
        start_ms,
        running,
    };
    if !state.is_consistent() {
        return Err(StoreError::Corrupt(format!(
            "running={} disagrees with startMs={:?}",
            state.running, state.start_ms
        )));
    }
    Ok(state)
}

/// Encode a state for storage
pub fn encode_state(state: &TimerState) -> Result<String, StoreError> {
    serde_json::to_string(state).map_err(|e| StoreError::Corrupt(e.to_string()))
}
