//! Study Timer - a shared wall-clock stopwatch for study sessions
//! 
//! The timer derives elapsed time from a stored anchor timestamp instead of a
//! ticking counter, persists its state between runs and keeps every open
//! context (view) of the timer in step over a named sync channel.

pub mod clock;
pub mod config;
pub mod state;
pub mod store;
pub mod sync;
pub mod api;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use state::{AppState, SharedTimer, StopReport, TimerState};
pub use store::{JsonFileStore, MemoryStore, TimerStore};
pub use sync::{SyncChannel, SyncHub};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
