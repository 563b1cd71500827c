//! State management module
//! 
//! This module contains the timer state, the pure operations over it, the
//! per-context state owner and the host application's state.

pub mod timer_state;
pub mod shared_timer;
pub mod app_state;

// Re-export main types
pub use timer_state::{format_hms, hms_to_minutes, TimerState};
pub use shared_timer::{SharedTimer, StopHook, StopReport};
pub use app_state::{AppState, DisplayLink};
